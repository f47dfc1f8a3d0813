//! Convenience re-exports for common `ctxptr` types.
//!
//! ```ignore
//! use ctxptr::prelude::*;
//! ```
//!
//! Pulls in the store, selector, formatter, the shipped rankers, and the
//! config and error types. The chat client and low-level identity helpers
//! stay in their modules.

pub use crate::build_context;
pub use crate::config::{FormatterConfig, PointerConfig, SelectorConfig, StoreConfig};
pub use crate::error::{ContextError, SelectionError, StoreError};
pub use crate::format::ContextFormatter;
pub use crate::pointer::ContextPointer;
pub use crate::select::{
    KeywordRanker, LlmRanker, RankCandidate, RankFuture, Ranker, RelevanceSelector,
};
pub use crate::store::PointerStore;
