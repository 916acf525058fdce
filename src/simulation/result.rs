//! Simulation result types.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Label of the majority-vote governance scenario.
pub const MAJORITY_LOGIC_LABEL: &str = "Majority Logic";

/// Label of the Qi governance scenario.
pub const QI_LOGIC_LABEL: &str = "Qi Logic";

/// Comparative scores for one scenario.
///
/// Indices are dimensionless, non-negative and unbounded above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    /// Scenario label (`"Majority Logic"` or `"Qi Logic"`).
    pub label: String,
    /// Innovation index.
    pub innovation_index: f64,
    /// Burnout index.
    pub burnout_index: f64,
    /// Liability index.
    pub liability_index: f64,
}

fn check_metric(metric: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidMetric {
            metric: metric.to_string(),
            value,
        })
    }
}

impl ScenarioMetrics {
    /// Creates scenario metrics, rejecting negative or non-finite scores.
    pub fn new(
        label: impl Into<String>,
        innovation_index: f64,
        burnout_index: f64,
        liability_index: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            label: label.into(),
            innovation_index: check_metric("innovation_index", innovation_index)?,
            burnout_index: check_metric("burnout_index", burnout_index)?,
            liability_index: check_metric("liability_index", liability_index)?,
        })
    }

    /// Fixed Majority Logic baseline: innovation 1.0, burnout 0.8, liability 0.7.
    #[must_use]
    pub fn majority_logic_baseline() -> Self {
        Self {
            label: MAJORITY_LOGIC_LABEL.to_string(),
            innovation_index: 1.0,
            burnout_index: 0.8,
            liability_index: 0.7,
        }
    }

    /// Fixed Qi Logic baseline: innovation 1.4, burnout 0.3, liability 0.1.
    #[must_use]
    pub fn qi_logic_baseline() -> Self {
        Self {
            label: QI_LOGIC_LABEL.to_string(),
            innovation_index: 1.4,
            burnout_index: 0.3,
            liability_index: 0.1,
        }
    }
}

/// Outcome of one simulation run: Majority Logic (A) against Qi Logic (B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Scenario A, Majority Logic.
    pub scenario_a: ScenarioMetrics,
    /// Scenario B, Qi Logic.
    pub scenario_b: ScenarioMetrics,
}

impl SimulationResult {
    /// Pairs two scenarios into a result.
    #[must_use]
    pub const fn new(scenario_a: ScenarioMetrics, scenario_b: ScenarioMetrics) -> Self {
        Self {
            scenario_a,
            scenario_b,
        }
    }

    /// The fixed comparison produced by every run.
    #[must_use]
    pub fn baseline() -> Self {
        Self::new(
            ScenarioMetrics::majority_logic_baseline(),
            ScenarioMetrics::qi_logic_baseline(),
        )
    }
}
