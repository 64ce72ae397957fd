//! In-memory progress storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ProgressStorage, StorageError};

/// Progress records kept in process memory.
///
/// Used for ephemeral sessions and tests. Clones share the same records,
/// which makes "a new store over the same storage" cheap to express.
#[derive(Debug, Default, Clone)]
pub struct MemoryProgressStorage {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryProgressStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw record, bypassing the store's write guards.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.records.lock().insert(key.into(), value.into());
    }

    /// Copy of every stored record.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl ProgressStorage for MemoryProgressStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records.lock().remove(key);
        Ok(())
    }
}
