//! Durable key-value slots backing the transcript and preference stores.
//!
//! The client depends on nothing more than string keys mapped to string
//! values, with absent keys reported as `None`. [`FileStore`] keeps one
//! file per key under the platform data directory; [`MemoryStore`] backs
//! tests and embedders that manage persistence themselves.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not determine a data directory for this platform")]
    NoStorageRoot,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("atomic replace failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Minimal contract the persistence collaborator must satisfy.
///
/// Failures are soft: callers log them and fall back to defaults rather
/// than refusing to start.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One file per key under a root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at the platform data directory.
    pub fn new() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("org", "palaver", "palaver")
            .ok_or(StorageError::NoStorageRoot)?;
        Ok(Self {
            root: dirs.data_dir().to_path_buf(),
        })
    }

    /// Store rooted at an explicit directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.slot_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        use io::Write;

        std::fs::create_dir_all(&self.root)?;
        // Write through a temp file in the same directory so the slot is
        // replaced atomically and never left half-written.
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(value.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(self.slot_path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store for tests and embedders.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.slots().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::with_root(dir.path());

        assert!(store.load("missing").expect("load").is_none());

        store.save("slot", "first").expect("save");
        assert_eq!(store.load("slot").expect("load").as_deref(), Some("first"));

        store.save("slot", "second").expect("overwrite");
        assert_eq!(store.load("slot").expect("load").as_deref(), Some("second"));

        store.remove("slot").expect("remove");
        assert!(store.load("slot").expect("load").is_none());
    }

    #[test]
    fn file_store_remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::with_root(dir.path());
        store.remove("never-written").expect("remove absent");
    }

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::default();
        assert!(store.load("slot").expect("load").is_none());
        store.save("slot", "value").expect("save");
        assert_eq!(store.load("slot").expect("load").as_deref(), Some("value"));
        store.remove("slot").expect("remove");
        assert!(store.load("slot").expect("load").is_none());
    }
}
