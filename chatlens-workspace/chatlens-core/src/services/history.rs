// src/services/history.rs
//! Single-writer history store.
//!
//! - Owns one JSON document: an array of `Record`s, newest first.
//! - Bounded: appending past `capacity` evicts the oldest record.
//! - Every mutation is read-modify-write under one lock, then committed with
//!   an atomic temp-file rename, so readers never observe a partial document.
//! - Reads are forgiving: a missing or corrupt document is an empty history.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::utils::fsio::write_atomic;

/// One classification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "chatContent")]
    pub input_excerpt: String,
    #[serde(alias = "analysis")]
    pub result_text: String,
}

/// Store limits. `HistoryConfig::policy()` builds this from `config.toml`.
#[derive(Debug, Clone)]
pub struct HistoryPolicy {
    pub capacity: usize,
    pub excerpt_max_chars: usize,
    pub excerpt_marker: String,
    pub write_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            capacity: 50,
            excerpt_max_chars: 200,
            excerpt_marker: "...".to_string(),
            write_retries: 3,
            retry_backoff: Duration::from_millis(20),
        }
    }
}

impl HistoryPolicy {
    /// Cut `text` to `excerpt_max_chars` chars, appending the marker only when cut.
    ///
    /// Counts Unicode scalar values, so multi-byte text is never split mid-character.
    pub fn excerpt(&self, text: &str) -> String {
        match text.char_indices().nth(self.excerpt_max_chars) {
            Some((byte_idx, _)) => {
                let mut out = String::with_capacity(byte_idx + self.excerpt_marker.len());
                out.push_str(&text[..byte_idx]);
                out.push_str(&self.excerpt_marker);
                out
            }
            None => text.to_string(),
        }
    }
}

/// State only the writer touches.
struct WriterState {
    /// Millisecond value of the last id handed out; ids are strictly increasing.
    last_issued_ms: i64,
}

/// HistoryStore is the single authority for reading and writing the history file.
pub struct HistoryStore {
    path: PathBuf,
    policy: HistoryPolicy,
    writer: Mutex<WriterState>,
}

impl HistoryStore {
    /// Open (or create) the history document at `path`.
    ///
    /// Behavior:
    /// - Creates the parent directory if missing.
    /// - Writes an empty `[]` document if none exists.
    /// - Seeds the id counter from ids already on disk so new ids stay unique.
    pub fn open(path: impl Into<PathBuf>, policy: HistoryPolicy) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let store = Self {
            path,
            policy,
            writer: Mutex::new(WriterState { last_issued_ms: 0 }),
        };

        if !store.path.exists() {
            store.persist(&[])?;
            tracing::info!(path = %store.path.display(), "created empty history");
        }

        let existing = store.list();
        let seed = existing
            .iter()
            .filter_map(|r| r.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        store.lock()?.last_issued_ms = seed;

        tracing::info!(
            path = %store.path.display(),
            records = existing.len(),
            capacity = store.policy.capacity,
            "history store opened"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &HistoryPolicy {
        &self.policy
    }

    /// Excerpt `input`, insert a new record at the front, evict past capacity,
    /// persist, return it.
    ///
    /// Empty or whitespace-only `input` is rejected with `EmptyInput` before
    /// anything is read or written. `result_text` is stored verbatim.
    /// On `Err`, the on-disk history is exactly what it was before the call.
    pub fn append(&self, input: &str, result_text: &str) -> Result<Record, StoreError> {
        if input.trim().is_empty() {
            return Err(StoreError::EmptyInput);
        }

        let mut writer = self.lock()?;
        let mut history = self.list();

        let taken: HashSet<&str> = history.iter().map(|r| r.id.as_str()).collect();
        let now = Utc::now().trunc_subsecs(3);
        let id_ms = next_id_ms(now.timestamp_millis(), writer.last_issued_ms, &taken)?;

        let record = Record {
            id: id_ms.to_string(),
            created_at: now,
            input_excerpt: self.policy.excerpt(input),
            result_text: result_text.to_string(),
        };

        history.insert(0, record.clone());
        let evicted = history.len().saturating_sub(self.policy.capacity);
        history.truncate(self.policy.capacity);

        self.persist(&history)?;
        writer.last_issued_ms = id_ms;

        tracing::debug!(id = %record.id, len = history.len(), evicted, "history append");
        Ok(record)
    }

    /// Newest-first snapshot. Missing, unreadable or corrupt state reads as empty.
    pub fn list(&self) -> Vec<Record> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "history unreadable; treating as empty");
                return Vec::new();
            }
        };
        if text.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<Record>>(&text) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "history corrupt; treating as empty");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.list().into_iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the newest record with `id`. Returns whether anything was removed.
    ///
    /// Files written by older services may repeat an id; one call removes one
    /// record. Nothing is written when the id is absent.
    pub fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let _writer = self.lock()?;
        let mut history = self.list();
        let Some(pos) = history.iter().position(|r| r.id == id) else {
            tracing::debug!(id, "history delete: not found");
            return Ok(false);
        };
        history.remove(pos);
        self.persist(&history)?;
        tracing::debug!(id, len = history.len(), "history delete");
        Ok(true)
    }

    /// Persist an empty history.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _writer = self.lock()?;
        self.persist(&[])?;
        tracing::info!(path = %self.path.display(), "history cleared");
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, WriterState>, StoreError> {
        self.writer.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Encode and atomically commit, retrying transient I/O failures a bounded
    /// number of times with linear backoff.
    fn persist(&self, history: &[Record]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(history)?;
        let attempts = self.policy.write_retries + 1;
        let mut last_err = None;
        for attempt in 1..=attempts {
            match write_atomic(&self.path, &bytes) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        attempt,
                        attempts,
                        error = %e,
                        "history write failed"
                    );
                    last_err = Some(e);
                    if attempt < attempts {
                        thread::sleep(self.policy.retry_backoff * attempt);
                    }
                }
            }
        }
        Err(StoreError::Persist {
            path: self.path.clone(),
            attempts,
            source: last_err.unwrap_or_else(|| io::Error::other("no write attempted")),
        })
    }
}

/// Smallest free id that is at least `now_ms` and above `last_issued_ms`.
fn next_id_ms(now_ms: i64, last_issued_ms: i64, taken: &HashSet<&str>) -> Result<i64, StoreError> {
    let exhausted = move || StoreError::IdSpaceExhausted {
        last_issued: last_issued_ms,
    };
    let mut id_ms = last_issued_ms.checked_add(1).ok_or_else(exhausted)?.max(now_ms);
    while taken.contains(id_ms.to_string().as_str()) {
        id_ms = id_ms.checked_add(1).ok_or_else(exhausted)?;
    }
    Ok(id_ms)
}

/// Build a record with a fixed timestamp. Used where the caller controls time
/// (imports, replay, tests of the aggregator).
///
/// `input_excerpt` is stored as given. A `created_at_ms` outside chrono's
/// representable range clamps to the Unix epoch.
pub fn record_at(
    id: impl Into<String>,
    created_at_ms: i64,
    input_excerpt: &str,
    result_text: &str,
) -> Record {
    let created_at = Utc
        .timestamp_millis_opt(created_at_ms)
        .single()
        .unwrap_or_default();
    Record {
        id: id.into(),
        created_at,
        input_excerpt: input_excerpt.to_string(),
        result_text: result_text.to_string(),
    }
}
