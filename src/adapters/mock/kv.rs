//! In-memory key-value store for tests.
//!
//! Backs the persistence layer without touching disk. Writes are
//! recorded so tests can assert not just final contents but how many
//! times a key was persisted, which is how write-through behavior is
//! verified.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{KeyValueStore, StorageError};

/// Shared-state [`KeyValueStore`] with fault injection.
///
/// Clones share contents, the write log, and the failure toggles.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    set_calls: Arc<Mutex<Vec<(String, String)>>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail
    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Make every subsequent `set` and `remove` fail
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Every successful `set` call in order
    pub fn set_calls(&self) -> Vec<(String, String)> {
        self.set_calls.lock().unwrap().clone()
    }

    /// How many times `key` has been written
    pub fn set_count(&self, key: &str) -> usize {
        self.set_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .count()
    }

    /// Current value without going through the async trait
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Seed a value directly
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: "injected read failure".to_string(),
            });
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.set_calls
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::RemoveFailed {
                key: key.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
