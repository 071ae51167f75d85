use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

/// Persisted keys. Three independent values, each read once at startup and
/// written on every mutation.
pub const FEEDS_KEY: &str = "rss_feeds";
pub const ARTICLES_KEY: &str = "rss_articles";
pub const LAST_UPDATED_KEY: &str = "rss_last_updated";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The injected persistence side-channel: a durable get/set pair over
/// JSON-serializable values. The core never validates or migrates what the
/// backend holds beyond deserializing it.
pub trait StateStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Volatile backend for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl StateStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let values = self.values.lock().expect("storage mutex poisoned");
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("storage mutex poisoned");
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Single-file backend: one JSON object on disk, rewritten on every set.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    values: Mutex<HashMap<String, Value>>,
}

impl JsonFileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(error) => return Err(error.into()),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &HashMap<String, Value>) -> Result<(), StorageError> {
        let serialized = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl StateStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let values = self.values.lock().expect("storage mutex poisoned");
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("storage mutex poisoned");
        values.insert(key.to_string(), value);
        self.flush(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trips_values() {
        let storage = MemoryStorage::default();
        assert!(storage.get(FEEDS_KEY).expect("get must succeed").is_none());

        storage
            .set(FEEDS_KEY, serde_json::json!([{"name": "HN", "url": "u"}]))
            .expect("set must succeed");
        let value = storage
            .get(FEEDS_KEY)
            .expect("get must succeed")
            .expect("value must exist");
        assert_eq!(value[0]["name"], "HN");
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir must create");
        let path = dir.path().join("state.json");

        let storage = JsonFileStorage::open(&path).expect("open must succeed");
        storage
            .set(LAST_UPDATED_KEY, serde_json::json!(1716677315000_i64))
            .expect("set must succeed");
        drop(storage);

        let reopened = JsonFileStorage::open(&path).expect("reopen must succeed");
        let value = reopened
            .get(LAST_UPDATED_KEY)
            .expect("get must succeed")
            .expect("value must persist");
        assert_eq!(value, serde_json::json!(1716677315000_i64));
    }
}
