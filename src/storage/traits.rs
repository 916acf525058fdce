//! Abstract storage trait for pilots.
//!
//! The store is the sole writer of pilot state. By using a trait, we enable:
//! - The in-memory backend used by the service and tests
//! - Alternative backends injected through `PilotService::with_parts`

use thiserror::Error;

use crate::monitor::SubscriptionBus;
use crate::pilot::{NewPilot, PilotId, PilotProject, PilotStatus};
use crate::simulation::SimulationResult;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Pilot not found.
    #[error("Pilot not found: {0}")]
    PilotNotFound(PilotId),

    /// The mutation would move the lifecycle backward or repeat a terminal state.
    #[error("Invalid transition for pilot {id}: {from} -> {to}")]
    InvalidTransition {
        /// Target pilot.
        id: PilotId,
        /// Current status.
        from: PilotStatus,
        /// Requested status.
        to: PilotStatus,
    },

    /// A change listener tried to mutate the store it is being notified by.
    #[error("Re-entrant mutation from a change listener ({0})")]
    ReentrantMutation(&'static str),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Permission to commit a simulation result through [`PilotStore::apply_result`].
///
/// Only this crate can construct one. External stores can implement
/// `apply_result`, but code outside the simulation pipeline cannot call it.
///
/// ```compile_fail
/// let _token = qipilot::storage::CommitToken(());
/// ```
#[derive(Debug)]
pub struct CommitToken(());

impl CommitToken {
    pub(crate) const fn new() -> Self {
        Self(())
    }
}

/// Storage trait for pilot operations.
///
/// # Notification Contract
/// - Every successful `create` or `apply_result` publishes exactly once on `bus()`
/// - The publish happens after the mutation is visible to reads
/// - Subscribers observe mutations in the order they were applied
pub trait PilotStore: Send + Sync {
    /// All pilots, newest-created first. The returned vector is an owned snapshot.
    fn list_all(&self) -> Result<Vec<PilotProject>, StorageError>;

    /// Register a new `Draft` pilot with a fresh id and the current timestamp.
    fn create(&self, fields: NewPilot) -> Result<PilotProject, StorageError>;

    /// Get a pilot by ID.
    fn get(&self, id: PilotId) -> Result<Option<PilotProject>, StorageError>;

    /// Mark a pilot `Completed` with its simulation result attached.
    ///
    /// Reserved for the simulation engine, which holds the [`CommitToken`].
    ///
    /// # Errors
    /// - `PilotNotFound`: if `id` does not exist
    /// - `InvalidTransition`: if the pilot is already `Completed`
    fn apply_result(
        &self,
        id: PilotId,
        result: SimulationResult,
        token: CommitToken,
    ) -> Result<PilotProject, StorageError>;

    /// Number of stored pilots.
    fn len(&self) -> Result<usize, StorageError>;

    /// The bus this store publishes changes on.
    fn bus(&self) -> &SubscriptionBus;

    /// Get a pilot by ID, failing with `PilotNotFound` when absent.
    fn require(&self, id: PilotId) -> Result<PilotProject, StorageError> {
        self.get(id)?.ok_or(StorageError::PilotNotFound(id))
    }

    /// Returns true if the store holds no pilots.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_pilot_store_object_safe(_: &dyn PilotStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::PilotNotFound(PilotId::new());
        assert!(err.to_string().contains("Pilot not found"));

        let err = StorageError::InvalidTransition {
            id: PilotId::new(),
            from: PilotStatus::Completed,
            to: PilotStatus::Completed,
        };
        assert!(err.to_string().contains("COMPLETED -> COMPLETED"));

        let err = StorageError::BackendError("poisoned lock: pilot.create".to_string());
        assert!(err.to_string().contains("pilot.create"));
    }
}
