//! Store configuration.
//!
//! Loaded from a JSON file when one exists; every field falls back to a
//! default so an empty object (or a missing file) is a valid config.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{StorageError, StorageResult};

/// Settings for persistence and server sync.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    /// Name of the persisted blob.
    #[serde(default = "default_storage_name")]
    pub storage_name: String,
    /// Directory holding the persisted blob.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Full URL of the scheduling endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Timeout for one sync request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_name: default_storage_name(),
            storage_dir: default_storage_dir(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl StoreConfig {
    /// Loads a config file, returning defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        serde_json::from_str(&contents)
            .map_err(|e| StorageError::deserialization(path.display().to_string(), e.to_string()))
    }

    /// Sets the blob name.
    pub fn with_storage_name(mut self, name: impl Into<String>) -> Self {
        self.storage_name = name.into();
        self
    }

    /// Sets the blob directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Sets the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the request timeout in seconds.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_storage_name() -> String {
    "schedule-storage".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_endpoint() -> String {
    "http://localhost:3000/api/schedule".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
