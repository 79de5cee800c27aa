//! Scoped key/value persistence.
//!
//! The cart writes one serialized blob under a fixed key. Adapters are
//! synchronous from the caller's point of view and may fail; callers decide
//! how to recover.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// Errors that can occur in a storage adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store refused the write because it is full.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// The key is not usable by this adapter.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Key/value persistence contract.
pub trait StorageAdapter: Send + Sync {
    /// Read the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `blob` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    fn set(&self, key: &str, blob: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be modified.
    fn clear(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: StorageAdapter + ?Sized> StorageAdapter for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        (**self).set(key, blob)
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        (**self).clear(key)
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage.
///
/// Cheaply cloneable; clones share the same slots, which lets a test
/// "reload" a cart by hydrating a second store from the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create empty storage with no quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty storage that rejects blobs longer than `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            slots: Arc::default(),
            quota: Some(bytes),
        }
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        if self.quota.is_some_and(|quota| blob.len() > quota) {
            return Err(StorageError::QuotaExceeded);
        }
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// File-backed storage: one `<key>.json` file per key under a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a crash
/// mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StorageAdapter for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
