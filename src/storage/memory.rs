//! In-memory storage backend.
//!
//! Thread-safe, process-lifetime pilot registry. Nothing is persisted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, RwLock};

use tracing::debug;

use crate::monitor::SubscriptionBus;
use crate::pilot::{NewPilot, PilotId, PilotProject, PilotStatus};
use crate::simulation::SimulationResult;
use crate::storage::traits::{CommitToken, PilotStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct PilotState {
    by_id: HashMap<PilotId, PilotProject>,
    // Creation order, oldest first.
    order: Vec<PilotId>,
}

/// Thread-safe in-memory pilot store.
///
/// Mutations are serialized by a commit lock held across apply + publish, so
/// every subscriber sees changes in the order they were applied. The record
/// lock is released before publishing, so listeners may read the store.
///
/// A listener that mutates the store on the notifying thread gets
/// `ReentrantMutation`. A listener that waits on a mutation made by another
/// thread deadlocks, since that mutation needs the commit lock.
#[derive(Default)]
pub struct InMemoryPilotStore {
    state: RwLock<PilotState>,
    commit: Mutex<()>,
    bus: SubscriptionBus,
}

impl fmt::Debug for InMemoryPilotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPilotStore")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl InMemoryPilotStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store publishing on an existing bus.
    ///
    /// Stores sharing a bus each number their changes from the same sequence;
    /// the bus delivers their publishes one at a time.
    #[must_use]
    pub fn with_bus(bus: SubscriptionBus) -> Self {
        Self {
            state: RwLock::default(),
            commit: Mutex::default(),
            bus,
        }
    }

    fn commit<T>(
        &self,
        context: &'static str,
        apply: impl FnOnce(&mut PilotState) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        if self.bus.is_dispatching() {
            return Err(StorageError::ReentrantMutation(context));
        }

        let _commit = self.commit.lock().map_err(|_| lock_err(context))?;
        let out = {
            let mut state = self.state.write().map_err(|_| lock_err(context))?;
            apply(&mut state)?
        };
        self.bus.publish();
        Ok(out)
    }
}

impl PilotStore for InMemoryPilotStore {
    fn list_all(&self) -> Result<Vec<PilotProject>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("pilot.list_all"))?;
        state
            .order
            .iter()
            .rev()
            .map(|id| {
                state.by_id.get(id).cloned().ok_or_else(|| {
                    StorageError::BackendError(format!("order index references missing pilot {id}"))
                })
            })
            .collect()
    }

    fn create(&self, fields: NewPilot) -> Result<PilotProject, StorageError> {
        let pilot = PilotProject::draft(fields);

        let created = self.commit("pilot.create", |state| {
            if state.by_id.contains_key(&pilot.id) {
                return Err(StorageError::BackendError(format!(
                    "duplicate pilot id: {}",
                    pilot.id
                )));
            }
            state.order.push(pilot.id);
            state.by_id.insert(pilot.id, pilot.clone());
            Ok(pilot)
        })?;

        debug!(pilot_id = %created.id, name = %created.name, "pilot created");
        Ok(created)
    }

    fn get(&self, id: PilotId) -> Result<Option<PilotProject>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("pilot.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn apply_result(
        &self,
        id: PilotId,
        result: SimulationResult,
        _token: CommitToken,
    ) -> Result<PilotProject, StorageError> {
        let updated = self.commit("pilot.apply_result", |state| {
            let pilot = state
                .by_id
                .get_mut(&id)
                .ok_or(StorageError::PilotNotFound(id))?;

            if !pilot.status.can_transition_to(PilotStatus::Completed) {
                return Err(StorageError::InvalidTransition {
                    id,
                    from: pilot.status,
                    to: PilotStatus::Completed,
                });
            }

            pilot.status = PilotStatus::Completed;
            pilot.simulation_result = Some(result);
            Ok(pilot.clone())
        })?;

        debug!(pilot_id = %id, "simulation result applied");
        Ok(updated)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("pilot.len"))?;
        Ok(state.by_id.len())
    }

    fn bus(&self) -> &SubscriptionBus {
        &self.bus
    }
}
