//! In-memory implementation of InputStore

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{InputStore, StoreError};

/// In-memory input store
///
/// The reference implementation used by the in-process runtime and by
/// tests. A deployment backed by real blob storage plugs in here.
///
/// # Example
///
/// ```
/// use redrive::InMemoryInputStore;
///
/// let store = InMemoryInputStore::new();
/// ```
pub struct InMemoryInputStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryInputStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored payloads
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether a payload exists for the given instance
    pub fn contains(&self, instance_id: &str) -> bool {
        self.entries.read().contains_key(instance_id)
    }
}

impl Default for InMemoryInputStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputStore for InMemoryInputStore {
    async fn put(&self, instance_id: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if entries.contains_key(instance_id) {
            return Err(StoreError::AlreadyExists(instance_id.to_string()));
        }
        entries.insert(instance_id.to_string(), payload);
        Ok(())
    }

    async fn read(&self, instance_id: &str) -> Result<Vec<u8>, StoreError> {
        self.entries
            .read()
            .get(instance_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(instance_id.to_string()))
    }

    async fn delete(&self, instance_id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(instance_id).is_some())
    }
}
