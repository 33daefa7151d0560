//! Storage Layer
//!
//! Owns the append-only alert logs, one JSON file per (team, severity).

mod key;
mod repository;

pub use key::LogKey;
pub use repository::{AlertStore, LOG_EXTENSION};

use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Existing log could not be parsed; it is left untouched
    #[error("Corrupt log at {}: {reason}", path.display())]
    CorruptLog { path: PathBuf, reason: String },

    /// Filesystem failure or rejected key
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// Append not confirmed in time
    #[error("Append timed out after {0}ms")]
    Timeout(u64),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::IoFailure(err.to_string())
    }
}
