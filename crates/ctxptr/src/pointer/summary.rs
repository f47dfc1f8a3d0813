//! Deterministic one-line summaries of tool invocations.
//!
//! The summary is what the ranker sees in place of the full result, so it has
//! to describe the call well enough to judge relevance. It is built only from
//! the tool name and an allow-list of argument keys.

use serde_json::{Map, Value};

/// Argument keys worth showing, in display order.
pub const SUMMARY_KEYS: &[&str] = &[
    "query", "q", "question", "topic", "url", "symbol", "ticker", "id", "ids", "name", "path",
    "period", "start", "end", "date", "limit", "max_results",
];

/// Maximum characters kept from a single argument value.
pub const MAX_VALUE_CHARS: usize = 80;

/// Build the summary for a tool call.
///
/// Format: `tool_name(key=value, ...)`. String values are quoted, arrays are
/// joined with `,`, and anything longer than [`MAX_VALUE_CHARS`] is cut with
/// `…`. A call with none of the allow-listed keys renders as `tool_name()`.
pub fn summarize(tool_name: &str, args: &Map<String, Value>) -> String {
    let parts: Vec<String> = SUMMARY_KEYS
        .iter()
        .filter_map(|key| {
            let value = args.get(*key)?;
            let rendered = render_value(value)?;
            Some(format!("{key}={rendered}"))
        })
        .collect();

    format!("{tool_name}({})", parts.join(", "))
}

fn render_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => format!("\"{}\"", clip(s.trim())),
        Value::Array(items) => {
            let joined: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            clip(&joined.join(","))
        }
        other => clip(&other.to_string()),
    };
    Some(text)
}

fn clip(s: &str) -> String {
    if s.chars().count() <= MAX_VALUE_CHARS {
        s.to_string()
    } else {
        let head: String = s.chars().take(MAX_VALUE_CHARS).collect();
        format!("{head}…")
    }
}
