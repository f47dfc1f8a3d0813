//! Durable, query-scoped pointer storage.
//!
//! Directory layout:
//! ```text
//! base_dir/
//!   <query_id>/
//!     <pointer_id>.result.json   full tool result
//!     <pointer_id>.meta.json     ContextPointer metadata
//! ```
//!
//! Each artifact is written to a uniquely named dot-file in the same
//! directory, synced, and renamed into place. The result is always published
//! before its metadata, so a reader that can see a `.meta.json` can also load
//! the result. Nothing is retried here; I/O errors go straight to the caller.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::finite::has_non_finite;
use crate::pointer::{ContextPointer, extract_source_urls, is_pointer_id, pointer_id, summarize};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const META_SUFFIX: &str = ".meta.json";
const RESULT_SUFFIX: &str = ".result.json";

/// Filesystem-backed pointer store.
///
/// Holds no in-memory state besides the root path, so any number of stores
/// (or processes) can share one `base_dir`.
#[derive(Debug, Clone)]
pub struct PointerStore {
    base_dir: PathBuf,
}

impl PointerStore {
    /// Create a store rooted at `base_dir`. Directories are created on first save.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.base_dir.clone())
    }

    /// The storage root.
    pub fn dir(&self) -> &Path {
        &self.base_dir
    }

    fn scope_dir(&self, query_id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_query_id(query_id) {
            return Err(StoreError::InvalidQueryId(query_id.to_string()));
        }
        Ok(self.base_dir.join(query_id))
    }

    // ── Writes ────────────────────────────────────────────────────

    /// Persist a tool result and return its pointer.
    ///
    /// Results that JSON cannot represent (maps with non-string keys, NaN or
    /// infinite floats) are stored as their `Debug` string instead of failing
    /// the save or silently turning into `null`.
    /// Saving the same invocation again overwrites the result and keeps the
    /// original `created_at`.
    pub fn save<R>(
        &self,
        query_id: &str,
        task_id: Option<&str>,
        tool_name: &str,
        args: &Map<String, Value>,
        result: &R,
    ) -> Result<ContextPointer, StoreError>
    where
        R: Serialize + Debug + ?Sized,
    {
        let dir = self.scope_dir(query_id)?;
        let id = pointer_id(tool_name, args, query_id, task_id);
        let summary = summarize(tool_name, args);

        let payload = match serde_json::to_value(result) {
            Ok(_) if has_non_finite(result) => {
                warn!("Result of {tool_name} ({id}) has NaN or infinite numbers, storing as string");
                Value::String(format!("{result:?}"))
            }
            Ok(v) => v,
            Err(e) => {
                warn!("Result of {tool_name} ({id}) is not JSON-serializable, storing as string: {e}");
                Value::String(format!("{result:?}"))
            }
        };
        let source_urls = extract_source_urls(&payload);

        std::fs::create_dir_all(&dir).map_err(|e| StoreError::storage(&dir, e))?;

        let result_path = dir.join(format!("{id}{RESULT_SUFFIX}"));
        let meta_path = dir.join(format!("{id}{META_SUFFIX}"));

        let result_bytes = serde_json::to_vec(&payload).map_err(|e| StoreError::Corrupt {
            path: result_path.clone(),
            source: e,
        })?;
        write_atomic(&dir, &result_path, &result_bytes)?;

        // A re-save is the same logical pointer; keep its place in the list.
        let created_at = match read_meta(&meta_path) {
            Ok(Some(existing)) => existing.created_at,
            _ => Utc::now(),
        };

        let pointer = ContextPointer {
            pointer_id: id,
            query_id: query_id.to_string(),
            task_id: task_id.map(str::to_string),
            tool_name: tool_name.to_string(),
            args: args.clone(),
            created_at,
            summary,
            result_path: result_path.display().to_string(),
            source_urls,
        };

        let meta_bytes =
            serde_json::to_vec_pretty(&pointer).map_err(|e| StoreError::Corrupt {
                path: meta_path.clone(),
                source: e,
            })?;
        write_atomic(&dir, &meta_path, &meta_bytes)?;

        debug!(
            "Saved pointer {} for {} in query {} ({} bytes)",
            pointer.pointer_id,
            tool_name,
            query_id,
            result_bytes.len()
        );
        Ok(pointer)
    }

    // ── Reads ─────────────────────────────────────────────────────

    /// All pointers saved under `query_id`, oldest first.
    ///
    /// Order comes from the wall-clock `created_at`, ties broken by
    /// `pointer_id`. Saves that land within the clock's resolution, or
    /// across a backwards clock step, may therefore list out of insertion
    /// order. Callers that need a strict sequence across processes must
    /// serialize their saves.
    ///
    /// Unknown, empty, or unusable query ids yield an empty list. Metadata
    /// files that fail to parse are skipped with a warning.
    pub fn list(&self, query_id: &str) -> Result<Vec<ContextPointer>, StoreError> {
        let Ok(dir) = self.scope_dir(query_id) else {
            return Ok(Vec::new());
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::storage(&dir, e))?;

        let mut pointers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::storage(&dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !name.ends_with(META_SUFFIX) {
                continue;
            }
            match read_meta(&entry.path()) {
                Ok(Some(pointer)) if pointer.query_id == query_id => pointers.push(pointer),
                Ok(Some(pointer)) => {
                    warn!(
                        "Skipping pointer {} filed under {query_id} but scoped to {}",
                        pointer.pointer_id, pointer.query_id
                    );
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable pointer metadata: {e}"),
            }
        }

        pointers.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.pointer_id.cmp(&b.pointer_id))
        });
        Ok(pointers)
    }

    /// Look up one pointer's metadata.
    pub fn get(
        &self,
        query_id: &str,
        pointer_id: &str,
    ) -> Result<Option<ContextPointer>, StoreError> {
        if !is_pointer_id(pointer_id) {
            return Ok(None);
        }
        let dir = self.scope_dir(query_id)?;
        read_meta(&dir.join(format!("{pointer_id}{META_SUFFIX}")))
    }

    /// Load the full result behind a pointer.
    ///
    /// The path is rebuilt from the pointer's scope and id rather than taken
    /// from `result_path`, so a pointer can never read outside its scope.
    pub fn load_result(&self, pointer: &ContextPointer) -> Result<Value, StoreError> {
        let not_found = || StoreError::NotFound {
            query_id: pointer.query_id.clone(),
            pointer_id: pointer.pointer_id.clone(),
        };
        if !is_pointer_id(&pointer.pointer_id) {
            return Err(not_found());
        }
        let dir = self.scope_dir(&pointer.query_id)?;
        let path = dir.join(format!("{}{RESULT_SUFFIX}", pointer.pointer_id));

        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(StoreError::storage(&path, e)),
        };
        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt { path, source: e })
    }
}

/// A query id is used verbatim as a directory name, so it must be exactly
/// one normal path component.
fn is_valid_query_id(query_id: &str) -> bool {
    !query_id.is_empty()
        && query_id != "."
        && query_id != ".."
        && !query_id.contains(['/', '\\', '\0'])
}

/// Read a metadata file. `Ok(None)` if it does not exist.
fn read_meta(path: &Path) -> Result<Option<ContextPointer>, StoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::storage(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Atomic write: unique temp file in `dir`, fsync, rename over `path`.
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| StoreError::storage(dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| StoreError::storage(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::storage(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::storage(path, e.error))?;
    Ok(())
}
