// src/error.rs
//! Typed failures of the history store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Submitted text was empty or whitespace only. Nothing was written.
    #[error("input text is empty")]
    EmptyInput,

    /// The updated history could not be committed to disk.
    #[error("failed to persist history to {path:?} after {attempts} attempt(s): {source}")]
    Persist {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),

    /// Ids already on disk leave no larger millisecond value to issue.
    #[error("record id space exhausted (last issued {last_issued})")]
    IdSpaceExhausted { last_issued: i64 },

    #[error("history writer lock poisoned")]
    LockPoisoned,

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// True when the caller sent bad input (as opposed to a storage failure).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, StoreError::EmptyInput)
    }
}
