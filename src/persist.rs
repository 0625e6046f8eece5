//! Persistence of the scheduling board.
//!
//! Only technicians, jobs and `lastSync` are persisted. The keyed
//! collections are written as plain arrays and re-keyed by `id` on load, so
//! the blob never depends on map iteration order.
//!
//! # Layout
//! ```json
//! { "technicians": [ ... ], "jobs": [ ... ], "lastSync": "2024-03-04T09:00:00Z" }
//! ```
//!
//! # Rehydration
//! A corrupted blob never fails startup. Each field falls back to its
//! default on its own, and malformed entries inside an otherwise valid
//! array are dropped.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::models::{Job, Keyed, Technician};

/// Durable named-blob storage.
pub trait StateStorage: Send + Sync {
    /// Reads a blob. `Ok(None)` if it was never written.
    fn load(&self, name: &str) -> StorageResult<Option<String>>;

    /// Writes a blob, replacing any previous contents.
    fn save(&self, name: &str, blob: &str) -> StorageResult<()>;
}

/// The persisted subset of the store state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSchedule {
    pub technicians: Vec<Technician>,
    pub jobs: Vec<Job>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl PersistedSchedule {
    /// Serializes to the blob layout.
    pub fn to_blob(&self) -> StorageResult<String> {
        serde_json::to_string(self).map_err(|e| StorageError::serialization(e.to_string()))
    }

    /// Parses a blob leniently.
    ///
    /// Never fails: anything unreadable is replaced by its default.
    pub fn from_blob(name: &str, blob: &str) -> Self {
        let value: Value = match serde_json::from_str(blob) {
            Ok(v) => v,
            Err(e) => {
                let err = StorageError::deserialization(name, e.to_string());
                tracing::warn!(error = %err, "Discarding unreadable persisted schedule");
                return Self::default();
            }
        };

        Self {
            technicians: entries(name, &value, "technicians"),
            jobs: entries(name, &value, "jobs"),
            last_sync: last_sync(name, &value),
        }
    }
}

/// Reads `lastSync`, treating anything but a timestamp or `null` as absent.
fn last_sync(name: &str, value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.get("lastSync").filter(|v| !v.is_null())?;
    match serde_json::from_value(raw.clone()) {
        Ok(instant) => Some(instant),
        Err(e) => {
            tracing::warn!(blob = name, field = "lastSync", error = %e, "Persisted field is malformed, using default");
            None
        }
    }
}

/// Reads an array field, skipping entries that don't deserialize.
fn entries<T: DeserializeOwned>(name: &str, value: &Value, field: &str) -> Vec<T> {
    let Some(items) = value.get(field).and_then(Value::as_array) else {
        if value.get(field).is_some_and(|v| !v.is_null()) {
            tracing::warn!(blob = name, field, "Persisted field is not an array, using default");
        }
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(blob = name, field, error = %e, "Skipping malformed persisted entry");
                None
            }
        })
        .collect()
}

/// Re-keys a list by each entry's ID. Later duplicates win.
pub fn index_by_id<T: Keyed>(items: impl IntoIterator<Item = T>) -> HashMap<String, T> {
    items
        .into_iter()
        .map(|item| (item.key().to_string(), item))
        .collect()
}

/// File-backed storage: one `{dir}/{name}.json` per blob.
///
/// Writes go to a temp file that is then renamed over the target, so a crash
/// mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates file storage rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates file storage rooted at the configured directory.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.storage_dir.clone())
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl StateStorage for FileStorage {
    fn load(&self, name: &str) -> StorageResult<Option<String>> {
        let path = self.blob_path(name);
        match fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn save(&self, name: &str, blob: &str) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let path = self.blob_path(name);
        let temp_path = self.dir.join(format!(".{}.json.tmp", name));
        fs::write(&temp_path, blob).map_err(|e| StorageError::io(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| StorageError::io(&path, e))
    }
}

/// In-memory storage, for tests and hosts without a durable medium.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-seeded with one blob.
    pub fn with_blob(name: impl Into<String>, blob: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.lock().insert(name.into(), blob.into());
        storage
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self, name: &str) -> StorageResult<Option<String>> {
        Ok(self.lock().get(name).cloned())
    }

    fn save(&self, name: &str, blob: &str) -> StorageResult<()> {
        self.lock().insert(name.to_string(), blob.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap()
    }

    fn sample() -> PersistedSchedule {
        PersistedSchedule {
            technicians: vec![Technician::new("T1"), Technician::new("T2").with_name("Sam")],
            jobs: vec![
                Job::new("J1", "T1", at(9), at(10)),
                Job::new("J2", "T2", at(11), at(12)).with_title("Install"),
            ],
            last_sync: Some(at(8)),
        }
    }

    #[test]
    fn test_blob_layout() {
        let blob = sample().to_blob().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();

        assert_eq!(value["technicians"].as_array().unwrap().len(), 2);
        assert_eq!(value["jobs"][1]["id"], "J2");
        assert_eq!(value["lastSync"], "2024-03-04T08:00:00Z");
    }

    #[test]
    fn test_reindex_ignores_order() {
        let mut reversed = sample();
        reversed.jobs.reverse();
        reversed.technicians.reverse();

        let original = sample();
        let a = PersistedSchedule::from_blob("s", &original.to_blob().unwrap());
        let b = PersistedSchedule::from_blob("s", &reversed.to_blob().unwrap());

        assert_eq!(index_by_id(a.jobs), index_by_id(b.jobs));
        assert_eq!(index_by_id(a.technicians), index_by_id(b.technicians));
        assert_eq!(a.last_sync, b.last_sync);
    }

    #[test]
    fn test_index_by_id_last_wins() {
        let jobs = vec![
            Job::new("J1", "T1", at(9), at(10)),
            Job::new("J1", "T2", at(9), at(10)),
        ];
        let index = index_by_id(jobs);
        assert_eq!(index.len(), 1);
        assert_eq!(index["J1"].technician_id, "T2");
    }

    #[test]
    fn test_garbage_blob_falls_back() {
        assert_eq!(
            PersistedSchedule::from_blob("s", "{not json"),
            PersistedSchedule::default()
        );
    }

    #[test]
    fn test_ill_shaped_fields_fall_back_independently() {
        let blob = r#"{
            "technicians": {"T1": {"id": "T1"}},
            "jobs": [
                {"id":"J1","technicianId":"T1","startTime":"2024-03-04T09:00:00Z","endTime":"2024-03-04T10:00:00Z"},
                {"id":"J2"}
            ],
            "lastSync": 42
        }"#;
        let restored = PersistedSchedule::from_blob("s", blob);

        assert!(restored.technicians.is_empty());
        assert_eq!(restored.jobs.len(), 1);
        assert_eq!(restored.jobs[0].id, "J1");
        assert_eq!(restored.last_sync, None);
    }

    #[test]
    fn test_malformed_last_sync_keeps_collections() {
        let blob = r#"{"technicians":[{"id":"T1"}],"jobs":[],"lastSync":"yesterday"}"#;
        let restored = PersistedSchedule::from_blob("s", blob);
        assert_eq!(restored.last_sync, None);
        assert_eq!(restored.technicians.len(), 1);
    }

    #[test]
    fn test_missing_fields() {
        let restored = PersistedSchedule::from_blob("s", "{}");
        assert_eq!(restored, PersistedSchedule::default());

        let restored = PersistedSchedule::from_blob("s", "null");
        assert_eq!(restored, PersistedSchedule::default());
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.load("schedule-storage").unwrap(), None);
        storage.save("schedule-storage", "{\"jobs\":[]}").unwrap();
        assert_eq!(
            storage.load("schedule-storage").unwrap().as_deref(),
            Some("{\"jobs\":[]}")
        );
        assert!(dir.path().join("nested/schedule-storage.json").exists());
        assert!(!dir.path().join("nested/.schedule-storage.json.tmp").exists());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::with_blob("a", "1");
        assert_eq!(storage.load("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.load("b").unwrap(), None);
        storage.save("b", "2").unwrap();
        assert_eq!(storage.load("b").unwrap().as_deref(), Some("2"));
    }
}
