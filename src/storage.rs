//! Durable key/value storage for the persisted state record.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use thiserror::Error;

use crate::util::sanitize_filename;

const TMP_FILENAME_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

/// A string key/value store, one record per key.
pub trait StateStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ---- File Storage ----

/// Stores each key as `<dir>/<key>.json`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(key, "storage")))
    }
}

impl StateStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_FILENAME_SUFFIX);

        // Write then rename; readers never see a partial record.
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ---- Memory Storage ----

/// In-process storage. Writes can be made to fail to simulate a full or
/// disabled store.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("memory storage lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .items
            .lock()
            .expect("memory storage lock")
            .get(key)
            .cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        self.items
            .lock()
            .expect("memory storage lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_set_get() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert!(storage.get_item("notes-storage").unwrap().is_none());
        storage.set_item("notes-storage", "{\"a\":1}").unwrap();
        assert_eq!(
            storage.get_item("notes-storage").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(storage.path_for("notes-storage").is_file());

        storage.set_item("notes-storage", "{\"a\":2}").unwrap();
        assert_eq!(
            storage.get_item("notes-storage").unwrap().as_deref(),
            Some("{\"a\":2}")
        );
    }

    #[test]
    fn test_file_storage_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set_item("k", "v").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn test_file_storage_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_eq!(storage.path_for("a/b:c"), dir.path().join("a-b-c.json"));
        assert_eq!(storage.path_for(".."), dir.path().join("storage.json"));

        storage.set_item("../escape", "v").unwrap();
        assert!(dir.path().join("-escape.json").is_file());
        assert_eq!(storage.get_item("../escape").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_storage_failing_writes() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "v1").unwrap();
        storage.set_fail_writes(true);
        assert!(matches!(
            storage.set_item("k", "v2"),
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v1"));
        storage.set_fail_writes(false);
        storage.set_item("k", "v3").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v3"));
        assert_eq!(storage.len(), 1);
    }
}
