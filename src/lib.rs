//! # qipilot - Pilot Projects for governance simulation
//!
//! qipilot keeps an in-process registry of Pilot Projects, each comparing a
//! "Majority Logic" governance policy with a "Qi Logic" one, and runs an
//! asynchronous simulation that commits a comparative result back to the
//! registry while notifying observers.
//!
//! ## Core Concepts
//!
//! - **PilotProject**: a registered comparison case with a monotonic lifecycle
//! - **PilotStore**: the sole writer of pilot state; publishes every mutation
//! - **SimulationEngine**: validates, waits, evaluates and commits one run
//! - **SubscriptionBus**: ordered fan-out with per-listener failure isolation
//! - **PilotService**: the context object exposing the operation surface
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qipilot::{NewPilot, PilotService, PilotType, ServiceConfig};
//!
//! let service = PilotService::new(ServiceConfig::default())?;
//! let pilot = service.create_pilot(
//!     NewPilot::builder()
//!         .name("Neo-Tokyo Transit Grid")
//!         .org_name("Neo-Tokyo Metro Authority")
//!         .pilot_type(PilotType::City)
//!         .region("Kanto")
//!         .primary_objective("Reduce commuter burnout")
//!         .majority_logic_desc("Routes follow the majority of riders")
//!         .qi_logic_desc("Routes start from the least-served stops")
//!         .build()?,
//! )?;
//! let result = service.run_simulation(pilot.id).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod advice;
pub mod error;
pub mod monitor;
pub mod pilot;
pub mod seed;
pub mod service;
pub mod simulation;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use advice::{Advice, AdviceRequest, AdviceStatus, CouncilAdvisor, StaticCouncilAdvisor};
pub use error::{ExecutionError, PilotError, PilotResult, ValidationError};
pub use monitor::{ChangeNotice, ChangeStream, Listener, ListenerId, Subscription, SubscriptionBus};
pub use pilot::{NewPilot, NewPilotBuilder, PilotId, PilotProject, PilotStatus, PilotType};
pub use service::{PilotService, ServiceConfig};
pub use simulation::{
    FixedScenarioEvaluator, ScenarioEvaluator, ScenarioMetrics, SimulationConfig, SimulationEngine,
    SimulationResult,
};
pub use storage::{CommitToken, InMemoryPilotStore, PilotStore, StorageError};
