//! Simulation engine.
//!
//! Produces the comparative governance result for one pilot and commits it
//! through [`PilotStore::apply_result`]. The engine never writes pilot state
//! directly.
//!
//! Each run holds an in-flight marker for its pilot; a second concurrent run on
//! the same id is rejected with `SimulationInProgress`. The processing delay,
//! evaluation and commit execute on a detached Tokio task, so dropping the
//! caller's future does not cancel a run that already started.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{ExecutionError, PilotError, PilotResult, ValidationError};
use crate::pilot::{PilotId, PilotProject, PilotStatus};
use crate::storage::{CommitToken, PilotStore};

use super::evaluator::{FixedScenarioEvaluator, ScenarioEvaluator};
use super::result::SimulationResult;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Artificial processing delay before a result is committed.
    pub processing_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            processing_delay: Duration::from_millis(1500),
        }
    }
}

impl SimulationConfig {
    /// Config with the given delay in milliseconds.
    #[must_use]
    pub const fn with_delay_ms(ms: u64) -> Self {
        Self {
            processing_delay: Duration::from_millis(ms),
        }
    }

    /// Validate the config. The processing delay must be non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.processing_delay.is_zero() {
            return Err(ValidationError::InvalidSimulationConfig {
                reason: "processing_delay must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

type InFlightSet = Arc<Mutex<HashSet<PilotId>>>;

/// Marks a pilot as having a run in flight until dropped.
struct InFlightGuard {
    set: InFlightSet,
    id: PilotId,
}

impl InFlightGuard {
    fn acquire(set: &InFlightSet, id: PilotId) -> PilotResult<Self> {
        let mut running = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(id) {
            return Err(ExecutionError::SimulationInProgress { id }.into());
        }
        Ok(Self {
            set: Arc::clone(set),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Must release even if another holder panicked while locked.
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Runs simulations against a pilot store.
#[derive(Clone)]
pub struct SimulationEngine {
    store: Arc<dyn PilotStore>,
    evaluator: Arc<dyn ScenarioEvaluator>,
    config: SimulationConfig,
    in_flight: InFlightSet,
}

impl fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Create an engine using the fixed scenario evaluator.
    pub fn new(store: Arc<dyn PilotStore>, config: SimulationConfig) -> PilotResult<Self> {
        Self::with_evaluator(store, Arc::new(FixedScenarioEvaluator::new()), config)
    }

    /// Create an engine with an explicit evaluator.
    pub fn with_evaluator(
        store: Arc<dyn PilotStore>,
        evaluator: Arc<dyn ScenarioEvaluator>,
        config: SimulationConfig,
    ) -> PilotResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            evaluator,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Returns true while a run for `id` is in flight.
    #[must_use]
    pub fn is_running(&self, id: PilotId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Number of runs currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Status as observed from outside: `Running` while a run is in flight.
    ///
    /// The store keeps the pre-run status until the result is committed.
    #[must_use]
    pub fn effective_status(&self, pilot: &PilotProject) -> PilotStatus {
        if pilot.status.can_transition_to(PilotStatus::Running) && self.is_running(pilot.id) {
            PilotStatus::Running
        } else {
            pilot.status
        }
    }

    fn ensure_runnable(&self, id: PilotId) -> PilotResult<PilotProject> {
        let pilot = self.store.require(id)?;
        if pilot.status.is_terminal() {
            warn!(pilot_id = %id, "simulation rejected: pilot already completed");
            return Err(ExecutionError::AlreadyCompleted { id }.into());
        }
        Ok(pilot)
    }

    /// Run the simulation for `id` and commit its result.
    ///
    /// Unknown ids, completed pilots and concurrent runs are rejected before
    /// any delay is incurred. Must be called from within a Tokio runtime.
    pub async fn run(&self, id: PilotId) -> PilotResult<SimulationResult> {
        self.ensure_runnable(id)?;

        let guard = InFlightGuard::acquire(&self.in_flight, id).map_err(|err| {
            warn!(pilot_id = %id, error = %err, "simulation rejected");
            err
        })?;

        // Re-read under the marker: a run may have committed since the first check.
        let pilot = self.ensure_runnable(id)?;

        let delay_ms = u64::try_from(self.config.processing_delay.as_millis()).unwrap_or(u64::MAX);
        info!(pilot_id = %id, pilot = %pilot.name, delay_ms, "simulation started");

        let task = tokio::spawn(execute_run(
            Arc::clone(&self.store),
            Arc::clone(&self.evaluator),
            pilot,
            self.config.processing_delay,
            guard,
        ));

        task.await
            .map_err(|e| PilotError::internal(format!("simulation task failed: {e}")))?
    }
}

async fn execute_run(
    store: Arc<dyn PilotStore>,
    evaluator: Arc<dyn ScenarioEvaluator>,
    pilot: PilotProject,
    delay: Duration,
    _guard: InFlightGuard,
) -> PilotResult<SimulationResult> {
    tokio::time::sleep(delay).await;

    let result = evaluator.evaluate(&pilot);
    let committed = store.apply_result(pilot.id, result, CommitToken::new())?;
    info!(pilot_id = %pilot.id, "simulation committed");

    committed
        .simulation_result
        .ok_or_else(|| PilotError::internal("committed pilot has no simulation result"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    use crate::pilot::{NewPilot, PilotType};
    use crate::storage::InMemoryPilotStore;

    fn fields(name: &str) -> NewPilot {
        NewPilot::builder()
            .name(name)
            .org_name("Test Org")
            .pilot_type(PilotType::Enterprise)
            .region("Test Region")
            .primary_objective("Test objective")
            .majority_logic_desc("majority")
            .qi_logic_desc("qi")
            .build()
            .unwrap()
    }

    fn engine_with_delay(ms: u64) -> (Arc<InMemoryPilotStore>, SimulationEngine) {
        let store = Arc::new(InMemoryPilotStore::new());
        let engine = SimulationEngine::new(store.clone(), SimulationConfig::with_delay_ms(ms)).unwrap();
        (store, engine)
    }

    #[test]
    fn config_rejects_zero_delay() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(SimulationConfig::with_delay_ms(0).validate().is_err());

        let store = Arc::new(InMemoryPilotStore::new());
        let err = SimulationEngine::new(store, SimulationConfig::with_delay_ms(0)).unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn run_commits_fixed_result() {
        let (store, engine) = engine_with_delay(10);
        let pilot = store.create(fields("a")).unwrap();

        let result = engine.run(pilot.id).await.unwrap();
        assert_eq!(result, SimulationResult::baseline());

        let stored = store.require(pilot.id).unwrap();
        assert_eq!(stored.status, PilotStatus::Completed);
        assert_eq!(stored.simulation_result, Some(result));
        assert_eq!(engine.in_flight(), 0);
    }

    #[tokio::test]
    async fn run_unknown_id_fails_without_delay() {
        let (_store, engine) = engine_with_delay(10_000);
        let started = Instant::now();
        let err = engine.run(PilotId::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn rerun_on_completed_is_rejected() {
        let (store, engine) = engine_with_delay(5);
        let pilot = store.create(fields("a")).unwrap();
        let first = engine.run(pilot.id).await.unwrap();

        let err = engine.run(pilot.id).await.unwrap_err();
        assert!(matches!(
            err,
            PilotError::Execution(ExecutionError::AlreadyCompleted { .. })
        ));
        assert_eq!(store.require(pilot.id).unwrap().simulation_result, Some(first));
    }

    #[tokio::test]
    async fn concurrent_run_same_id_is_rejected() {
        let (store, engine) = engine_with_delay(50);
        let pilot = store.create(fields("a")).unwrap();

        let (a, b) = tokio::join!(engine.run(pilot.id), engine.run(pilot.id));
        assert!(a.is_ok());
        let err = b.unwrap_err();
        assert!(matches!(
            err,
            PilotError::Execution(ExecutionError::SimulationInProgress { .. })
        ));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn run_survives_poisoned_in_flight_set() {
        let (store, engine) = engine_with_delay(5);
        let pilot = store.create(fields("a")).unwrap();

        let set = Arc::clone(&engine.in_flight);
        let _ = std::thread::spawn(move || {
            let _held = set.lock().unwrap();
            panic!("poison the in-flight set");
        })
        .join();
        assert!(engine.in_flight.is_poisoned());

        let result = engine.run(pilot.id).await.unwrap();
        assert_eq!(result, SimulationResult::baseline());
        assert!(!engine.is_running(pilot.id));
        assert_eq!(engine.in_flight(), 0);
    }

    #[tokio::test]
    async fn effective_status_reports_running_while_in_flight() {
        let (store, engine) = engine_with_delay(50);
        let pilot = store.create(fields("a")).unwrap();

        let observer = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let current = store.require(pilot.id).unwrap();
            (current.status, engine.effective_status(&current))
        };
        let (result, (stored, effective)) = tokio::join!(engine.run(pilot.id), observer);

        result.unwrap();
        assert_eq!(stored, PilotStatus::Draft);
        assert_eq!(effective, PilotStatus::Running);

        let done = store.require(pilot.id).unwrap();
        assert_eq!(engine.effective_status(&done), PilotStatus::Completed);
    }
}
