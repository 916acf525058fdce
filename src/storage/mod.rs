//! Pilot storage.
//!
//! `PilotStore` defines the storage contract; `InMemoryPilotStore` is the
//! process-lifetime backend.

mod memory;
mod traits;

pub use memory::InMemoryPilotStore;
pub use traits::{CommitToken, PilotStore, StorageError};
