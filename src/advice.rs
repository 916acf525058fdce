//! Council advice contract.
//!
//! The advisor is an external collaborator: given a pilot's narrative fields it
//! returns structured governance feedback. Nothing in the store or engine reads
//! the advice; callers display it as an opaque value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pilot::PilotProject;

/// Council verdict on a pilot's Qi Logic policy.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdviceStatus {
    Approve,
    Revise,
    Block,
}

impl fmt::Display for AdviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "APPROVE"),
            Self::Revise => write!(f, "REVISE"),
            Self::Block => write!(f, "BLOCK"),
        }
    }
}

/// Input to the advisor.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    pub primary_objective: String,
    pub majority_logic_desc: String,
    pub qi_logic_desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_voices: Option<String>,
}

impl AdviceRequest {
    /// Build a request from a pilot's narrative fields.
    #[must_use]
    pub fn for_pilot(
        pilot: &PilotProject,
        harms: Option<String>,
        community_voices: Option<String>,
    ) -> Self {
        Self {
            primary_objective: pilot.primary_objective.clone(),
            majority_logic_desc: pilot.majority_logic_desc.clone(),
            qi_logic_desc: pilot.qi_logic_desc.clone(),
            harms,
            community_voices,
        }
    }
}

/// Structured advice returned by the council.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub qi_policy_summary: String,
    pub required_changes: Vec<String>,
    pub risk_flags: Vec<String>,
    pub curb_cut_benefits: Vec<String>,
    pub status: AdviceStatus,
}

/// Produces council advice.
pub trait CouncilAdvisor: Send + Sync {
    /// Advise on one request.
    fn advise(&self, request: &AdviceRequest) -> Advice;
}

/// Deterministic advisor returning static council guidance.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCouncilAdvisor;

impl StaticCouncilAdvisor {
    /// Create the advisor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CouncilAdvisor for StaticCouncilAdvisor {
    fn advise(&self, request: &AdviceRequest) -> Advice {
        Advice {
            qi_policy_summary: format!(
                "Pursue \"{}\" by weighting decisions toward the people most exposed to harm, \
                 not only the largest voting bloc.",
                request.primary_objective
            ),
            required_changes: vec![
                "Name the least-served group explicitly and give it a standing seat in review."
                    .to_string(),
                "Publish the burnout and liability measures before the pilot starts.".to_string(),
                "Add a reversal path when harm indicators rise for two consecutive periods."
                    .to_string(),
            ],
            risk_flags: vec![
                "Majority outcomes may hide concentrated harm in small groups.".to_string(),
                "Advisory input without decision weight tends to erode trust.".to_string(),
            ],
            curb_cut_benefits: vec![
                "Designing for the most burdened users lowers friction for everyone.".to_string(),
                "Early harm signals reduce downstream liability for the organization.".to_string(),
            ],
            status: AdviceStatus::Revise,
        }
    }
}
