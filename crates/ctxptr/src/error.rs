//! Error types for the store, the selector, and configuration loading.
//!
//! Identity and summary derivation are total and have no error type. Store
//! errors are never retried internally. Selection errors only reach the
//! caller when fail-closed is disabled; otherwise the selector turns them
//! into an empty selection.

use std::path::PathBuf;
use std::time::Duration;

/// Errors surfaced by [`PointerStore`](crate::store::PointerStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The query id cannot be used as a storage namespace.
    #[error("invalid query id {0:?}: must be a non-empty single path component")]
    InvalidQueryId(String),

    /// No durable result record exists for the pointer within its scope.
    #[error("no result stored for pointer {pointer_id} in query {query_id}")]
    NotFound {
        query_id: String,
        pointer_id: String,
    },

    /// A durable write or read failed.
    #[error("storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record exists but could not be decoded.
    #[error("corrupt record at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the record simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// A failed call into the ranking capability.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// The ranker itself reported an error.
    #[error("ranker failed: {0}")]
    Ranker(String),

    /// The ranker did not answer within the configured timeout.
    #[error("ranker timed out after {0:?}")]
    Timeout(Duration),

    /// The ranker answered with something that is not `{"pointer_ids": [...]}`.
    #[error("malformed ranker response: {0}")]
    Malformed(String),
}

/// Errors from the end-to-end [`build_context`](crate::build_context) flow.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Errors from [`PointerConfig::from_env`](crate::config::PointerConfig::from_env).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
