//! The ranking capability seam.
//!
//! A [`Ranker`] sees only the query and `(pointer_id, summary)` pairs, and
//! answers with raw text that should contain `{"pointer_ids": [...]}`. The
//! selector owns parsing and validation so every ranker gets the same
//! treatment, however it decides relevance.

use crate::error::SelectionError;
use crate::pointer::ContextPointer;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Ranker::rank`].
pub type RankFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

/// What a ranker is allowed to see about a pointer.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RankCandidate {
    pub pointer_id: String,
    pub summary: String,
}

impl From<&ContextPointer> for RankCandidate {
    fn from(pointer: &ContextPointer) -> Self {
        Self {
            pointer_id: pointer.pointer_id.clone(),
            summary: pointer.summary.clone(),
        }
    }
}

/// Expected ranker answer.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct SelectionResponse {
    /// Chosen pointer ids, most relevant first.
    pub pointer_ids: Vec<String>,
}

/// An opaque relevance judge.
///
/// Implementations may be rule-based, call a model, or hit a remote service.
/// Errors are plain strings; the selector decides whether they reach the
/// caller.
///
/// # Example
///
/// ```ignore
/// struct FirstOnly;
///
/// impl Ranker for FirstOnly {
///     fn rank<'a>(&'a self, _query: &'a str, candidates: &'a [RankCandidate]) -> RankFuture<'a> {
///         let ids: Vec<&str> = candidates.iter().take(1).map(|c| c.pointer_id.as_str()).collect();
///         let body = serde_json::json!({ "pointer_ids": ids }).to_string();
///         Box::pin(async move { Ok(body) })
///     }
/// }
/// ```
pub trait Ranker: Send + Sync {
    /// Judge `candidates` against `query`.
    ///
    /// Uses a boxed future so that the trait is dyn-compatible.
    fn rank<'a>(&'a self, query: &'a str, candidates: &'a [RankCandidate]) -> RankFuture<'a>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "ranker"
    }
}

/// Parse a raw ranker answer into a [`SelectionResponse`].
///
/// A surrounding Markdown code fence is tolerated. Anything else that does
/// not match the response schema is [`SelectionError::Malformed`].
pub fn parse_response(raw: &str) -> Result<SelectionResponse, SelectionError> {
    let body = strip_code_fence(raw.trim());
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SelectionError::Malformed(format!("not JSON: {e}")))?;

    let schema = crate::json_schema_for::<SelectionResponse>();
    if let Ok(validator) = jsonschema::validator_for(&schema) {
        let errors: Vec<String> = validator
            .iter_errors(&value)
            .map(|e| format!("{}: {e}", e.instance_path()))
            .collect();
        if !errors.is_empty() {
            return Err(SelectionError::Malformed(errors.join("; ")));
        }
    }

    serde_json::from_value(value).map_err(|e| SelectionError::Malformed(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line.
    match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with('{') => body.trim(),
        _ => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_response() {
        let parsed = parse_response(r#"{"pointer_ids": ["a", "b"]}"#).unwrap();
        assert_eq!(parsed.pointer_ids, vec!["a", "b"]);
    }

    #[test]
    fn parses_fenced_response() {
        let raw = "```json\n{\"pointer_ids\": [\"x\"]}\n```";
        assert_eq!(parse_response(raw).unwrap().pointer_ids, vec!["x"]);

        let bare_fence = "```{\"pointer_ids\": []}```";
        assert!(parse_response(bare_fence).unwrap().pointer_ids.is_empty());
    }

    #[test]
    fn rejects_wrong_shapes() {
        for raw in [
            "I think pointer a is best",
            r#"{"ids": ["a"]}"#,
            r#"{"pointer_ids": "a"}"#,
            r#"{"pointer_ids": [1, 2]}"#,
            r#"["a", "b"]"#,
            "",
        ] {
            assert!(
                matches!(parse_response(raw), Err(SelectionError::Malformed(_))),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn candidate_exposes_only_id_and_summary() {
        let value = serde_json::to_value(RankCandidate {
            pointer_id: "abc".into(),
            summary: "search()".into(),
        })
        .unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
    }
}
