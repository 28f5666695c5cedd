//! Append-only event group log and the save pipeline feeding it.

mod blob;
mod memory;
mod save;
mod traits;
mod types;

pub use blob::BlobEventGroupStore;
pub use memory::{InMemoryBlobStore, InMemoryEventGroupStore};
pub use save::EventSaver;
pub use traits::{AtomicBlobStore, EventGroupStore, StoreResult};
pub use types::{EventGroup, EventGroupKey, EventType, SavePolicy};
