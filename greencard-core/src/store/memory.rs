//! In-memory stores, used by tests and by hosts that keep events elsewhere.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::traits::{AtomicBlobStore, EventGroupStore, StoreResult};
use super::types::{EventGroup, EventGroupKey};
use crate::error::GreenCardError;

fn poisoned() -> GreenCardError {
    GreenCardError::Storage {
        error: "mutex poisoned".to_string(),
    }
}

/// Event group store holding everything in a `Vec`.
#[derive(Debug, Default)]
pub struct InMemoryEventGroupStore {
    groups: Mutex<Vec<EventGroup>>,
}

impl InMemoryEventGroupStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventGroupStore for InMemoryEventGroupStore {
    fn insert_all(&self, groups: Vec<EventGroup>) -> StoreResult<()> {
        self.groups.lock().map_err(|_| poisoned())?.extend(groups);
        Ok(())
    }

    fn replace(&self, key: &EventGroupKey, groups: Vec<EventGroup>) -> StoreResult<()> {
        let mut guard = self.groups.lock().map_err(|_| poisoned())?;
        guard.retain(|group| group.key() != *key);
        guard.extend(groups);
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<EventGroup>> {
        Ok(self.groups.lock().map_err(|_| poisoned())?.clone())
    }

    fn list_for_key(&self, key: &EventGroupKey) -> StoreResult<Vec<EventGroup>> {
        Ok(self
            .groups
            .lock()
            .map_err(|_| poisoned())?
            .iter()
            .filter(|group| group.key() == *key)
            .cloned()
            .collect())
    }

    fn clear(&self) -> StoreResult<()> {
        self.groups.lock().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

/// Blob store holding everything in a map.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Creates an empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AtomicBlobStore for InMemoryBlobStore {
    fn read(&self, path: String) -> Result<Option<Vec<u8>>, GreenCardError> {
        Ok(self.blobs.lock().map_err(|_| poisoned())?.get(&path).cloned())
    }

    fn write_atomic(&self, path: String, bytes: Vec<u8>) -> Result<(), GreenCardError> {
        self.blobs.lock().map_err(|_| poisoned())?.insert(path, bytes);
        Ok(())
    }

    fn delete(&self, path: String) -> Result<(), GreenCardError> {
        self.blobs.lock().map_err(|_| poisoned())?.remove(&path);
        Ok(())
    }

    fn list(&self, prefix: String) -> Result<Vec<String>, GreenCardError> {
        Ok(self
            .blobs
            .lock()
            .map_err(|_| poisoned())?
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect())
    }
}
