//! Error types for keysync core operations.
//!
//! Construction-time failures are fatal and visible to the caller.
//! Write-time failures are always surfaced, never silently dropped.
//! Read-time failures (malformed stored data) are not errors at all:
//! they are recovered locally and show up only in the log.

use thiserror::Error;

/// Result type alias for keysync operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Core error type for keysync operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage area is inaccessible (failed the writability probe)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Value could not be encoded as JSON
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}
