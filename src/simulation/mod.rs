//! Simulation pipeline: Majority Logic vs Qi Logic.
//!
//! A run validates its pilot, waits out the processing delay, evaluates both
//! scenarios and commits the result back to the store.

pub mod engine;
pub mod evaluator;
pub mod result;

pub use engine::{SimulationConfig, SimulationEngine};
pub use evaluator::{FixedScenarioEvaluator, ScenarioEvaluator};
pub use result::{ScenarioMetrics, SimulationResult, MAJORITY_LOGIC_LABEL, QI_LOGIC_LABEL};
