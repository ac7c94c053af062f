//! File-based key-value store adapter.
//!
//! One file per key under a root directory, named by the key itself.
//! Keys are plain identifiers (`conversations`, `api_key`), never
//! paths. The directory is created on first write; a missing file
//! reads as absent rather than an error, which is what lets a fresh
//! install bootstrap cleanly.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::traits::{KeyValueStore, StorageError};

/// Directory name under the home directory for the default location
const DATA_DIR: &str = ".trunky";

/// [`KeyValueStore`] persisting each key to its own file
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The conventional data directory, `~/.trunky`
    pub fn default_location() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DATA_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
