//! Configuration for the store, selector, and formatter.
//!
//! Every component takes its own config value at construction; there is no
//! process-wide state. [`PointerConfig`] bundles the three for callers that
//! want a single place to load settings from.
//!
//! # Examples
//!
//! ```ignore
//! let config = PointerConfig::default()
//!     .with_base_dir("/var/lib/agent/pointers")
//!     .with_max_selected(3)
//!     .with_max_chars(12_000);
//! ```
//!
//! Environment overrides (all optional):
//!
//! | variable | field |
//! |---|---|
//! | `CTXPTR_DIR` | `store.base_dir` |
//! | `CTXPTR_MAX_SELECTED` | `selector.max_selected` |
//! | `CTXPTR_FAIL_CLOSED` | `selector.fail_closed` |
//! | `CTXPTR_SELECTION_MODEL` | `selector.model` |
//! | `CTXPTR_SELECTION_TIMEOUT_SECS` | `selector.timeout` |
//! | `CTXPTR_MAX_CHARS` | `formatter.max_chars` |

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default number of pointers a selection may return.
pub const DEFAULT_MAX_SELECTED: usize = 5;

/// Default character budget for formatted context.
pub const DEFAULT_MAX_CHARS: usize = 24_000;

/// Default ranker timeout.
pub const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_secs(30);

// ── Store ─────────────────────────────────────────────────────────

/// Where pointers are persisted.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory; each query id gets a subdirectory. Default: `.agents/pointers`.
    pub base_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(".agents/pointers"),
        }
    }
}

// ── Selector ──────────────────────────────────────────────────────

/// How candidate pointers are narrowed down.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Upper bound on returned pointers. Default: [`DEFAULT_MAX_SELECTED`].
    pub max_selected: usize,
    /// Return an empty selection on ranker failure instead of an error.
    /// Default: `true`.
    pub fail_closed: bool,
    /// Model used by LLM-backed rankers. `None` means [`crate::DEFAULT_MODEL`].
    pub model: Option<String>,
    /// Hard limit on a single ranker call. Default: [`DEFAULT_SELECTION_TIMEOUT`].
    pub timeout: Duration,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_selected: DEFAULT_MAX_SELECTED,
            fail_closed: true,
            model: None,
            timeout: DEFAULT_SELECTION_TIMEOUT,
        }
    }
}

impl SelectorConfig {
    /// The model to rank with, falling back to the crate default.
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(crate::DEFAULT_MODEL)
    }
}

// ── Formatter ─────────────────────────────────────────────────────

/// Output bound for formatted context.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Maximum characters (not bytes) in the formatted block.
    pub max_chars: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

// ── Bundle ────────────────────────────────────────────────────────

/// All component configs in one value.
#[derive(Debug, Clone, Default)]
pub struct PointerConfig {
    pub store: StoreConfig,
    pub selector: SelectorConfig,
    pub formatter: FormatterConfig,
}

impl PointerConfig {
    /// Defaults overlaid with any `CTXPTR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("CTXPTR_DIR").filter(|d| !d.trim().is_empty()) {
            config.store.base_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup("CTXPTR_MAX_SELECTED") {
            config.selector.max_selected = parse_value("CTXPTR_MAX_SELECTED", &v)?;
        }
        if let Some(v) = lookup("CTXPTR_FAIL_CLOSED") {
            config.selector.fail_closed = parse_bool("CTXPTR_FAIL_CLOSED", &v)?;
        }
        if let Some(model) = lookup("CTXPTR_SELECTION_MODEL").filter(|m| !m.trim().is_empty()) {
            config.selector.model = Some(model);
        }
        if let Some(v) = lookup("CTXPTR_SELECTION_TIMEOUT_SECS") {
            let secs: u64 = parse_value("CTXPTR_SELECTION_TIMEOUT_SECS", &v)?;
            config.selector.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("CTXPTR_MAX_CHARS") {
            config.formatter.max_chars = parse_value("CTXPTR_MAX_CHARS", &v)?;
        }

        Ok(config)
    }

    /// Set the storage root.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store.base_dir = dir.into();
        self
    }

    /// Set the selection cap.
    pub fn with_max_selected(mut self, max: usize) -> Self {
        self.selector.max_selected = max;
        self
    }

    /// Enable or disable fail-closed selection.
    pub fn with_fail_closed(mut self, fail_closed: bool) -> Self {
        self.selector.fail_closed = fail_closed;
        self
    }

    /// Set the ranking model.
    pub fn with_selection_model(mut self, model: impl Into<String>) -> Self {
        self.selector.model = Some(model.into());
        self
    }

    /// Set the ranker timeout.
    pub fn with_selection_timeout(mut self, timeout: Duration) -> Self {
        self.selector.timeout = timeout;
        self
    }

    /// Set the formatter character budget.
    pub fn with_max_chars(mut self, max: usize) -> Self {
        self.formatter.max_chars = max;
        self
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true/false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_fail_closed_and_small() {
        let config = PointerConfig::default();
        assert!(config.selector.fail_closed);
        assert_eq!(config.selector.max_selected, 5);
        assert_eq!(config.selector.model(), crate::DEFAULT_MODEL);
        assert_eq!(config.formatter.max_chars, DEFAULT_MAX_CHARS);
    }

    #[test]
    fn env_overrides_apply() {
        let config = PointerConfig::from_lookup(lookup_from(&[
            ("CTXPTR_DIR", "/tmp/ptrs"),
            ("CTXPTR_MAX_SELECTED", "2"),
            ("CTXPTR_FAIL_CLOSED", "off"),
            ("CTXPTR_SELECTION_MODEL", "some/model"),
            ("CTXPTR_SELECTION_TIMEOUT_SECS", "7"),
            ("CTXPTR_MAX_CHARS", "500"),
        ]))
        .unwrap();

        assert_eq!(config.store.base_dir, PathBuf::from("/tmp/ptrs"));
        assert_eq!(config.selector.max_selected, 2);
        assert!(!config.selector.fail_closed);
        assert_eq!(config.selector.model(), "some/model");
        assert_eq!(config.selector.timeout, Duration::from_secs(7));
        assert_eq!(config.formatter.max_chars, 500);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = PointerConfig::from_lookup(lookup_from(&[("CTXPTR_MAX_SELECTED", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("CTXPTR_MAX_SELECTED"));

        let err = PointerConfig::from_lookup(lookup_from(&[("CTXPTR_FAIL_CLOSED", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("true/false"));
    }

    #[test]
    fn builders_chain() {
        let config = PointerConfig::default()
            .with_base_dir("x")
            .with_max_selected(1)
            .with_fail_closed(false)
            .with_selection_model("m")
            .with_selection_timeout(Duration::from_millis(10))
            .with_max_chars(42);
        assert_eq!(config.store.base_dir, PathBuf::from("x"));
        assert_eq!(config.selector.max_selected, 1);
        assert!(!config.selector.fail_closed);
        assert_eq!(config.selector.model.as_deref(), Some("m"));
        assert_eq!(config.formatter.max_chars, 42);
    }
}
