//! Durable tool-result pointers and bounded, relevance-selected context.
//!
//! Tool calls in an agent loop produce results that are far too large to
//! paste into every later prompt. `ctxptr` stores each result once, behind a
//! small content-addressed [`ContextPointer`], and when it is time to
//! synthesize an answer it picks only the pointers that matter and renders
//! them into a text block of bounded size.
//!
//! # Flow
//!
//! ```text
//! tool result ──► PointerStore::save ──► <base_dir>/<query_id>/<id>.{result,meta}.json
//!
//! synthesis request:
//!   PointerStore::list(query_id)
//!     ──► RelevanceSelector::select(query, candidates)   (ranker sees ids + summaries only)
//!     ──► ContextFormatter::format(selected)             (≤ max_chars)
//!     ──► text for the synthesis step
//! ```
//!
//! # Getting started
//!
//! ```ignore
//! use ctxptr::prelude::*;
//!
//! let config = PointerConfig::from_env()?;
//! let store = PointerStore::from_config(&config.store);
//!
//! let args = serde_json::json!({"query": "tokio runtime"});
//! store.save("q1", None, "search", args.as_object().unwrap(), &results)?;
//!
//! let ranker = KeywordRanker::new();
//! let context = build_context(&store, &ranker, &config, "q1", "How does tokio schedule tasks?").await?;
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pointer`] | [`ContextPointer`], content-addressed ids, summaries, source URLs |
//! | [`store`] | [`PointerStore`]: atomic, query-scoped persistence |
//! | [`select`] | [`RelevanceSelector`], the [`Ranker`] trait, keyword and LLM rankers |
//! | [`format`] | [`ContextFormatter`]: budgeted rendering |
//! | [`client`] | Chat completions client used by the LLM ranker |
//! | [`config`] | Per-component configuration and env loading |
//! | [`error`] | Store, selection, and config errors |
//!
//! # Failure policy
//!
//! Selection is fail-closed: if the ranker errors, times out, or answers
//! with garbage, the selection is empty. Nothing is ever selected by
//! default. Set [`SelectorConfig::fail_closed`] to `false` to get the
//! [`SelectionError`] instead. Store errors always propagate and are never
//! retried.

pub mod client;
pub mod config;
pub mod error;
mod finite;
pub mod format;
pub mod pointer;
pub mod prelude;
pub mod select;
pub mod store;

use schemars::JsonSchema;

pub use config::{FormatterConfig, PointerConfig, SelectorConfig, StoreConfig};
pub use error::{ConfigError, ContextError, SelectionError, StoreError};
pub use format::ContextFormatter;
pub use pointer::ContextPointer;
pub use select::{Ranker, RelevanceSelector};
pub use store::PointerStore;

// Re-export schemars for rankers that build their own schemas.
pub use schemars;

/// Default model for LLM-backed ranking when none is configured.
pub const DEFAULT_MODEL: &str = "z-ai/glm-5";

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`.
///
/// # Example
///
/// ```
/// use ctxptr::json_schema_for;
/// use ctxptr::select::SelectionResponse;
///
/// let schema = json_schema_for::<SelectionResponse>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"pointer_ids".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

/// List, select, and format in one call.
///
/// Returns the formatted block for `query` built from the pointers stored
/// under `query_id`. Empty when nothing is stored, nothing is relevant, or
/// selection failed closed.
pub async fn build_context(
    store: &PointerStore,
    ranker: &dyn Ranker,
    config: &PointerConfig,
    query_id: &str,
    query: &str,
) -> Result<String, ContextError> {
    let candidates = store.list(query_id)?;
    let selected = RelevanceSelector::new(ranker, config.selector.clone())
        .select(query, &candidates)
        .await?;
    let text = ContextFormatter::new(store, config.formatter.clone()).format(&selected)?;
    Ok(text)
}
