//! Error types for persistence and server sync.
//!
//! Neither error ever escapes a store operation: persistence failures are
//! logged and sync failures are recorded in the store's `error` field. They
//! are public so custom `StateStorage` and `ScheduleSource` implementations
//! can report failures the same way the built-in ones do.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the persisted blob.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while touching the blob file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error serializing the persisted state.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The blob exists but is not valid JSON.
    #[error("deserialization error in '{name}': {message}")]
    Deserialization { name: String, message: String },
}

impl StorageError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a deserialization error for a named blob.
    pub fn deserialization(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialization {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while fetching the authoritative schedule.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Failed to sync: HTTP {status}")]
    Status { status: u16 },

    /// The body could not be decoded into technicians and jobs.
    #[error("invalid schedule payload: {0}")]
    Decode(String),
}

impl SyncError {
    /// Create a status error.
    pub fn status(status: u16) -> Self {
        Self::Status { status }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

/// Convenience type alias for sync results.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        assert_eq!(SyncError::status(500).to_string(), "Failed to sync: HTTP 500");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::io(
            "/tmp/schedule-storage.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/schedule-storage.json"));

        let err = StorageError::deserialization("schedule-storage", "expected value");
        assert_eq!(
            err.to_string(),
            "deserialization error in 'schedule-storage': expected value"
        );
    }
}
