//! Render selected pointers into one bounded block of text.
//!
//! Each pointer becomes a labeled block:
//!
//! ```text
//! ### search(query="rust") [0123456789ab] query=q1
//! <full result>
//! ```
//!
//! Consecutive blocks are separated by a blank line.
//!
//! Blocks are appended in selection order while they fit the character
//! budget. The first block that does not fit keeps its header, gets as much
//! content as still fits plus [`TRUNCATION_MARKER`], and ends the output.
//! Budgets count `char`s, not bytes.

use crate::config::FormatterConfig;
use crate::error::StoreError;
use crate::pointer::ContextPointer;
use crate::store::PointerStore;
use serde_json::Value;
use tracing::{debug, warn};

/// Appended to content cut short by the budget.
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Placed between consecutive blocks, never after the last one.
const BLOCK_SEPARATOR: &str = "\n\n";

/// Loads selected results from a store and renders them.
pub struct ContextFormatter<'s> {
    store: &'s PointerStore,
    config: FormatterConfig,
}

impl<'s> ContextFormatter<'s> {
    pub fn new(store: &'s PointerStore, config: FormatterConfig) -> Self {
        Self { store, config }
    }

    /// Render `selected` in order, never exceeding `max_chars` characters.
    ///
    /// Pointers whose result has disappeared from the store are skipped.
    /// Any other store error is returned.
    pub fn format(&self, selected: &[ContextPointer]) -> Result<String, StoreError> {
        let mut out = String::new();
        let mut remaining = self.config.max_chars;

        for pointer in selected {
            let result = match self.store.load_result(pointer) {
                Ok(r) => r,
                Err(e) if e.is_not_found() => {
                    warn!("Skipping pointer {} with no stored result", pointer.pointer_id);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let header = block_header(pointer);
            let content = render_content(&result);
            let separator = if out.is_empty() { "" } else { BLOCK_SEPARATOR };
            let lead_len = separator.chars().count() + header.chars().count();
            let content_len = content.chars().count();

            if lead_len + content_len <= remaining {
                out.push_str(separator);
                out.push_str(&header);
                out.push_str(&content);
                remaining -= lead_len + content_len;
                continue;
            }

            let marker_len = TRUNCATION_MARKER.chars().count();
            if lead_len + marker_len <= remaining {
                let keep = remaining - lead_len - marker_len;
                out.push_str(separator);
                out.push_str(&header);
                out.extend(content.chars().take(keep));
                out.push_str(TRUNCATION_MARKER);
                debug!(
                    "Truncated pointer {} to {keep} of {content_len} chars",
                    pointer.pointer_id
                );
            } else {
                debug!(
                    "No room left for pointer {} ({remaining} chars remaining)",
                    pointer.pointer_id
                );
            }
            break;
        }

        Ok(out)
    }
}

fn block_header(pointer: &ContextPointer) -> String {
    format!(
        "### {} [{}] query={}\n",
        pointer.summary, pointer.pointer_id, pointer.query_id
    )
}

/// Strings are inserted verbatim; everything else as pretty JSON.
fn render_content(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
