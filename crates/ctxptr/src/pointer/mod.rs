//! The [`ContextPointer`] record and the pure functions that derive it.
//!
//! - [`identity`] — content-addressed [`pointer_id`] over canonical JSON.
//! - [`summary`] — template-driven one-line [`summarize`].
//!
//! Nothing here touches the filesystem. The store in
//! [`crate::store`] is the only place pointers are created.

pub mod identity;
pub mod summary;

pub use identity::{POINTER_ID_LEN, canonical_json, is_pointer_id, pointer_id};
pub use summary::summarize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of provenance URLs recorded per pointer.
pub const MAX_SOURCE_URLS: usize = 20;

/// Metadata for one persisted tool result.
///
/// The full payload lives next to it in the store and is loaded separately
/// with [`PointerStore::load_result`](crate::store::PointerStore::load_result).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextPointer {
    /// Content-addressed identifier (12 lowercase hex characters).
    pub pointer_id: String,
    /// Synthesis request this pointer belongs to.
    pub query_id: String,
    /// Optional sub-task within the query.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Tool that produced the result.
    pub tool_name: String,
    /// Tool invocation arguments.
    #[serde(default)]
    pub args: Map<String, Value>,
    /// When the pointer was first persisted.
    pub created_at: DateTime<Utc>,
    /// Deterministic description shown to the ranker.
    pub summary: String,
    /// Where the full result payload is stored.
    pub result_path: String,
    /// Provenance URLs found in the result.
    #[serde(default)]
    pub source_urls: Vec<String>,
}

/// Collect provenance URLs from a tool result.
///
/// Looks at string values under `url`, `link`, `href` and `source_url` keys,
/// plus any string that itself starts with `http://` or `https://`.
/// Order is first-seen, duplicates are dropped, at most
/// [`MAX_SOURCE_URLS`] are returned.
pub fn extract_source_urls(result: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    collect_urls(result, &mut urls);
    urls
}

fn collect_urls(value: &Value, urls: &mut Vec<String>) {
    if urls.len() >= MAX_SOURCE_URLS {
        return;
    }
    match value {
        Value::String(s) => push_url(s, urls),
        Value::Array(items) => {
            for item in items {
                collect_urls(item, urls);
            }
        }
        Value::Object(map) => {
            for (key, v) in map {
                match (key.as_str(), v) {
                    ("url" | "link" | "href" | "source_url", Value::String(s)) => {
                        push_url(s, urls)
                    }
                    _ => collect_urls(v, urls),
                }
            }
        }
        _ => {}
    }
}

fn push_url(candidate: &str, urls: &mut Vec<String>) {
    let candidate = candidate.trim();
    let is_http = candidate.starts_with("http://") || candidate.starts_with("https://");
    if is_http
        && !candidate.contains(char::is_whitespace)
        && urls.len() < MAX_SOURCE_URLS
        && !urls.iter().any(|u| u == candidate)
    {
        urls.push(candidate.to_string());
    }
}
