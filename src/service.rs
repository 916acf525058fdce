//! Pilot service: the operation surface over store, engine and advisor.
//!
//! `PilotService` is the explicit context object constructed once at process
//! start and handed to whatever exposes the operations (a transport, a CLI,
//! tests). Each construction gets a fresh store.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::advice::{Advice, AdviceRequest, CouncilAdvisor, StaticCouncilAdvisor};
use crate::error::PilotResult;
use crate::monitor::{ChangeStream, Subscription};
use crate::pilot::{NewPilot, PilotId, PilotProject};
use crate::seed;
use crate::simulation::{
    FixedScenarioEvaluator, ScenarioEvaluator, SimulationConfig, SimulationEngine,
    SimulationResult,
};
use crate::storage::{InMemoryPilotStore, PilotStore};

/// Service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Simulation engine settings.
    pub simulation: SimulationConfig,
    /// Load the fixed demo pilots on construction.
    pub seed_demo_data: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            seed_demo_data: true,
        }
    }
}

/// Transport-agnostic pilot operations.
#[derive(Clone)]
pub struct PilotService {
    store: Arc<dyn PilotStore>,
    engine: SimulationEngine,
    advisor: Arc<dyn CouncilAdvisor>,
}

impl fmt::Debug for PilotService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PilotService")
            .field("engine", &self.engine)
            .field("listeners", &self.store.bus().listener_count())
            .finish_non_exhaustive()
    }
}

impl PilotService {
    /// Create a service over a fresh in-memory store.
    pub fn new(config: ServiceConfig) -> PilotResult<Self> {
        Self::with_parts(
            Arc::new(InMemoryPilotStore::new()),
            Arc::new(FixedScenarioEvaluator::new()),
            Arc::new(StaticCouncilAdvisor::new()),
            config,
        )
    }

    /// Create a service from explicit collaborators.
    pub fn with_parts(
        store: Arc<dyn PilotStore>,
        evaluator: Arc<dyn ScenarioEvaluator>,
        advisor: Arc<dyn CouncilAdvisor>,
        config: ServiceConfig,
    ) -> PilotResult<Self> {
        let engine =
            SimulationEngine::with_evaluator(Arc::clone(&store), evaluator, config.simulation)?;

        if config.seed_demo_data {
            let seeded = seed::load_demo_pilots(store.as_ref())?;
            info!(seeded, "demo pilots loaded");
        }

        Ok(Self {
            store,
            engine,
            advisor,
        })
    }

    /// Register a new pilot (`POST create-pilot`).
    pub fn create_pilot(&self, fields: NewPilot) -> PilotResult<PilotProject> {
        Ok(self.store.create(fields)?)
    }

    /// All pilots, newest first (`GET list-pilots`).
    pub fn list_pilots(&self) -> PilotResult<Vec<PilotProject>> {
        Ok(self.store.list_all()?)
    }

    /// One pilot (`GET get-pilot`); not-found errors map to a 404.
    pub fn get_pilot(&self, id: PilotId) -> PilotResult<PilotProject> {
        Ok(self.store.require(id)?)
    }

    /// Run and commit a simulation (`POST run-simulation`).
    pub async fn run_simulation(&self, id: PilotId) -> PilotResult<SimulationResult> {
        self.engine.run(id).await
    }

    /// Council advice for a stored pilot.
    pub fn request_advice(
        &self,
        id: PilotId,
        harms: Option<String>,
        community_voices: Option<String>,
    ) -> PilotResult<Advice> {
        let pilot = self.store.require(id)?;
        let request = AdviceRequest::for_pilot(&pilot, harms, community_voices);
        Ok(self.advisor.advise(&request))
    }

    /// Register a change listener.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.bus().subscribe(listener)
    }

    /// Attach a bounded change stream.
    #[must_use]
    pub fn watch(&self, capacity: usize) -> ChangeStream {
        self.store.bus().watch(capacity)
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PilotStore> {
        &self.store
    }

    /// The simulation engine.
    #[must_use]
    pub const fn engine(&self) -> &SimulationEngine {
        &self.engine
    }
}
