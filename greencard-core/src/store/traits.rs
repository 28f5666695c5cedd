//! Persistence contracts.

use super::types::{EventGroup, EventGroupKey};
use crate::error::GreenCardError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, GreenCardError>;

/// Append-only log of event groups, keyed by provider and event type.
///
/// Callers serialize writes per key (see [`super::EventSaver`]); implementations only
/// need to make each call atomic on its own.
pub trait EventGroupStore: Send + Sync {
    /// Appends groups.
    ///
    /// # Errors
    /// Returns an error if the write fails. The groups of one key are written
    /// together or not at all; keys written before the failure stay written.
    fn insert_all(&self, groups: Vec<EventGroup>) -> StoreResult<()>;

    /// Replaces every group stored under `key` with `groups`.
    ///
    /// # Errors
    /// Returns an error if the write fails. The previous groups remain in that case.
    fn replace(&self, key: &EventGroupKey, groups: Vec<EventGroup>) -> StoreResult<()>;

    /// All stored groups, oldest insert first.
    ///
    /// # Errors
    /// Returns an error if the read fails.
    fn list(&self) -> StoreResult<Vec<EventGroup>>;

    /// Groups stored under `key`, oldest insert first.
    ///
    /// # Errors
    /// Returns an error if the read fails.
    fn list_for_key(&self, key: &EventGroupKey) -> StoreResult<Vec<EventGroup>>;

    /// Removes every group.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    fn clear(&self) -> StoreResult<()>;
}

/// Atomic blob store for small binary files, provided by the platform.
#[uniffi::export(with_foreign)]
pub trait AtomicBlobStore: Send + Sync {
    /// Reads the blob at `path`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read(&self, path: String) -> Result<Option<Vec<u8>>, GreenCardError>;

    /// Writes bytes atomically to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_atomic(&self, path: String, bytes: Vec<u8>) -> Result<(), GreenCardError>;

    /// Deletes the blob at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, path: String) -> Result<(), GreenCardError>;

    /// Lists the blob paths starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list(&self, prefix: String) -> Result<Vec<String>, GreenCardError>;
}
