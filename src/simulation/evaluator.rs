//! Scenario evaluation seam.

use crate::pilot::PilotProject;

use super::result::SimulationResult;

/// Computes the comparative result for a pilot.
///
/// Runs after the processing delay, on the simulation task.
pub trait ScenarioEvaluator: Send + Sync {
    /// Evaluate both scenarios for `pilot`.
    fn evaluate(&self, pilot: &PilotProject) -> SimulationResult;
}

/// Evaluator returning the fixed Majority Logic / Qi Logic comparison.
///
/// The pilot's narrative fields are not consulted.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedScenarioEvaluator;

impl FixedScenarioEvaluator {
    /// Create the evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ScenarioEvaluator for FixedScenarioEvaluator {
    fn evaluate(&self, _pilot: &PilotProject) -> SimulationResult {
        SimulationResult::baseline()
    }
}
