//! Content-addressed pointer identifiers.
//!
//! A pointer id is the first [`POINTER_ID_LEN`] hex characters of the SHA-256
//! of a canonical JSON encoding of `{args, query_id, task_id, tool_name}`.
//! Canonical means object keys sorted at every depth and compact separators,
//! so two argument maps with the same entries hash the same no matter how
//! they were built. Collisions are not detected.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Length of a pointer id in hex characters.
pub const POINTER_ID_LEN: usize = 12;

/// Compute the pointer id for a tool invocation within a query scope.
pub fn pointer_id(
    tool_name: &str,
    args: &Map<String, Value>,
    query_id: &str,
    task_id: Option<&str>,
) -> String {
    let mut identity = Map::new();
    identity.insert("args".into(), Value::Object(args.clone()));
    identity.insert("query_id".into(), Value::String(query_id.to_string()));
    identity.insert(
        "task_id".into(),
        task_id.map_or(Value::Null, |t| Value::String(t.to_string())),
    );
    identity.insert("tool_name".into(), Value::String(tool_name.to_string()));

    let canonical = canonical_json(&Value::Object(identity));
    let digest = Sha256::digest(canonical.as_bytes());

    let mut hex = String::with_capacity(POINTER_ID_LEN);
    for byte in digest.iter().take(POINTER_ID_LEN / 2) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Whether `s` looks like a pointer id (fixed length, lowercase hex).
pub fn is_pointer_id(s: &str) -> bool {
    s.len() == POINTER_ID_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Serialize a JSON value with object keys sorted at every level.
///
/// Strings and numbers use serde_json's own formatting, which is already
/// deterministic. Only key order needs fixing.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
