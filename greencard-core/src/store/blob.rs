//! Event group store persisting one CBOR log per key into an [`AtomicBlobStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::traits::{AtomicBlobStore, EventGroupStore, StoreResult};
use super::types::{EventGroup, EventGroupKey};
use crate::error::GreenCardError;

const LOG_VERSION: u32 = 1;
const LOG_PREFIX: &str = "event_groups/";

#[derive(Serialize, Deserialize)]
struct EventGroupLog {
    version: u32,
    groups: Vec<EventGroup>,
}

impl EventGroupLog {
    fn serialize(&self) -> StoreResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes).map_err(|err| {
            GreenCardError::SerializationError {
                error: err.to_string(),
            }
        })?;
        Ok(bytes)
    }

    fn deserialize(bytes: &[u8]) -> StoreResult<Self> {
        let log: Self = ciborium::de::from_reader(bytes).map_err(|err| {
            GreenCardError::SerializationError {
                error: err.to_string(),
            }
        })?;
        if log.version != LOG_VERSION {
            return Err(GreenCardError::Storage {
                error: format!("unsupported event group log version: {}", log.version),
            });
        }
        Ok(log)
    }
}

/// Path of the log for `key`. The provider identifier is hex encoded to keep paths flat.
fn log_path(key: &EventGroupKey) -> String {
    format!(
        "{LOG_PREFIX}{}/{}.cbor",
        key.event_type,
        hex::encode(key.provider_identifier.as_bytes())
    )
}

/// Event group store on top of a platform blob store.
///
/// Each key's log is rewritten atomically; a batch spanning several keys is written
/// key by key.
pub struct BlobEventGroupStore {
    blob_store: Arc<dyn AtomicBlobStore>,
}

impl std::fmt::Debug for BlobEventGroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobEventGroupStore").finish_non_exhaustive()
    }
}

impl BlobEventGroupStore {
    /// Creates a store writing into `blob_store`.
    #[must_use]
    pub fn new(blob_store: Arc<dyn AtomicBlobStore>) -> Self {
        Self { blob_store }
    }

    fn read_log(&self, path: &str) -> StoreResult<Vec<EventGroup>> {
        match self.blob_store.read(path.to_string())? {
            Some(bytes) => Ok(EventGroupLog::deserialize(&bytes)?.groups),
            None => Ok(Vec::new()),
        }
    }

    fn write_log(&self, path: &str, groups: Vec<EventGroup>) -> StoreResult<()> {
        if groups.is_empty() {
            return self.blob_store.delete(path.to_string());
        }
        let bytes = EventGroupLog {
            version: LOG_VERSION,
            groups,
        }
        .serialize()?;
        self.blob_store.write_atomic(path.to_string(), bytes)
    }
}

impl EventGroupStore for BlobEventGroupStore {
    fn insert_all(&self, groups: Vec<EventGroup>) -> StoreResult<()> {
        let mut by_key: BTreeMap<EventGroupKey, Vec<EventGroup>> = BTreeMap::new();
        for group in groups {
            by_key.entry(group.key()).or_default().push(group);
        }
        for (key, new_groups) in by_key {
            let path = log_path(&key);
            let mut existing = self.read_log(&path)?;
            existing.extend(new_groups);
            self.write_log(&path, existing)?;
        }
        Ok(())
    }

    fn replace(&self, key: &EventGroupKey, groups: Vec<EventGroup>) -> StoreResult<()> {
        if let Some(foreign) = groups.iter().find(|group| group.key() != *key) {
            return Err(GreenCardError::InvalidInput {
                error: format!("event group {} does not belong to {key:?}", foreign.id()),
            });
        }
        self.write_log(&log_path(key), groups)
    }

    fn list(&self) -> StoreResult<Vec<EventGroup>> {
        let mut paths = self.blob_store.list(LOG_PREFIX.to_string())?;
        paths.sort();
        let mut groups = Vec::new();
        for path in paths {
            groups.extend(self.read_log(&path)?);
        }
        Ok(groups)
    }

    fn list_for_key(&self, key: &EventGroupKey) -> StoreResult<Vec<EventGroup>> {
        self.read_log(&log_path(key))
    }

    fn clear(&self) -> StoreResult<()> {
        for path in self.blob_store.list(LOG_PREFIX.to_string())? {
            self.blob_store.delete(path)?;
        }
        Ok(())
    }
}
