//! Pilot Project types and identity.
//!
//! A Pilot Project is a registered comparison case between two governance
//! policies. The store owns every `PilotProject`; callers only ever see
//! snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::simulation::SimulationResult;

/// Globally unique, stable pilot identifier.
///
/// Assigned by the store at creation and never changed afterwards.
///
/// # Examples
///
/// ```
/// use qipilot::PilotId;
///
/// let id = PilotId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PilotId(Uuid);

impl PilotId {
    /// Creates a new random pilot ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a pilot ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for PilotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PilotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PilotId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Kind of organization running the pilot.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PilotType {
    Enterprise,
    City,
    Healthcare,
}

impl fmt::Display for PilotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enterprise => write!(f, "ENTERPRISE"),
            Self::City => write!(f, "CITY"),
            Self::Healthcare => write!(f, "HEALTHCARE"),
        }
    }
}

/// Lifecycle state of a pilot.
///
/// The lifecycle only moves forward: `Draft -> Configured -> Running -> Completed`.
/// A commit may skip intermediate states, but nothing ever moves backward and
/// `Completed` is terminal.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PilotStatus {
    Draft,
    Configured,
    Running,
    Completed,
}

impl PilotStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::Configured => 1,
            Self::Running => 2,
            Self::Completed => 3,
        }
    }

    /// Returns true if moving from `self` to `next` keeps the lifecycle monotonic.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Default for PilotStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for PilotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::Configured => write!(f, "CONFIGURED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// A registered pilot.
///
/// Descriptive fields are immutable after creation. `simulation_result` is
/// present iff `status == Completed`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotProject {
    pub id: PilotId,
    pub name: String,
    pub org_name: String,
    #[serde(rename = "type")]
    pub pilot_type: PilotType,
    pub region: String,
    pub primary_objective: String,
    pub majority_logic_desc: String,
    pub qi_logic_desc: String,
    pub status: PilotStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_result: Option<SimulationResult>,
}

impl PilotProject {
    /// Materializes a fresh `Draft` record from creation fields.
    pub(crate) fn draft(fields: NewPilot) -> Self {
        let NewPilot {
            name,
            org_name,
            pilot_type,
            region,
            primary_objective,
            majority_logic_desc,
            qi_logic_desc,
        } = fields;

        Self {
            id: PilotId::new(),
            name,
            org_name,
            pilot_type,
            region,
            primary_objective,
            majority_logic_desc,
            qi_logic_desc,
            status: PilotStatus::Draft,
            created_at: Utc::now(),
            simulation_result: None,
        }
    }

    /// Returns true once a simulation result has been committed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PilotStatus::Completed
    }
}

/// Caller-supplied fields for a new pilot.
///
/// Everything except `id`, `created_at`, `status` and `simulation_result`,
/// which the store assigns.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPilot {
    pub name: String,
    pub org_name: String,
    #[serde(rename = "type")]
    pub pilot_type: PilotType,
    pub region: String,
    pub primary_objective: String,
    pub majority_logic_desc: String,
    pub qi_logic_desc: String,
}

impl NewPilot {
    /// Creates a builder for pilot creation fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use qipilot::{NewPilot, PilotType};
    ///
    /// let fields = NewPilot::builder()
    ///     .name("Neo-Tokyo Transit Grid")
    ///     .org_name("Neo-Tokyo Metro Authority")
    ///     .pilot_type(PilotType::City)
    ///     .region("Kanto")
    ///     .primary_objective("Reduce commuter burnout")
    ///     .majority_logic_desc("Majority vote on route changes")
    ///     .qi_logic_desc("Weight decisions by least-served riders")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(fields.pilot_type, PilotType::City);
    /// ```
    #[must_use]
    pub fn builder() -> NewPilotBuilder {
        NewPilotBuilder::new()
    }
}

/// Builder for [`NewPilot`].
///
/// Only checks that every field was supplied; empty strings are accepted.
#[derive(Debug, Default)]
pub struct NewPilotBuilder {
    name: Option<String>,
    org_name: Option<String>,
    pilot_type: Option<PilotType>,
    region: Option<String>,
    primary_objective: Option<String>,
    majority_logic_desc: Option<String>,
    qi_logic_desc: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::MissingField {
        field: field.to_string(),
    })
}

impl NewPilotBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pilot name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the organization name.
    #[must_use]
    pub fn org_name(mut self, org_name: impl Into<String>) -> Self {
        self.org_name = Some(org_name.into());
        self
    }

    /// Sets the pilot type.
    #[must_use]
    pub fn pilot_type(mut self, pilot_type: PilotType) -> Self {
        self.pilot_type = Some(pilot_type);
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the primary objective.
    #[must_use]
    pub fn primary_objective(mut self, objective: impl Into<String>) -> Self {
        self.primary_objective = Some(objective.into());
        self
    }

    /// Sets the Majority Logic narrative.
    #[must_use]
    pub fn majority_logic_desc(mut self, desc: impl Into<String>) -> Self {
        self.majority_logic_desc = Some(desc.into());
        self
    }

    /// Sets the Qi Logic narrative.
    #[must_use]
    pub fn qi_logic_desc(mut self, desc: impl Into<String>) -> Self {
        self.qi_logic_desc = Some(desc.into());
        self
    }

    /// Builds the creation fields.
    /// Returns `ValidationError::MissingField` for the first field never supplied.
    pub fn build(self) -> Result<NewPilot, ValidationError> {
        Ok(NewPilot {
            name: required(self.name, "name")?,
            org_name: required(self.org_name, "org_name")?,
            pilot_type: required(self.pilot_type, "type")?,
            region: required(self.region, "region")?,
            primary_objective: required(self.primary_objective, "primary_objective")?,
            majority_logic_desc: required(self.majority_logic_desc, "majority_logic_desc")?,
            qi_logic_desc: required(self.qi_logic_desc, "qi_logic_desc")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_builder() -> NewPilotBuilder {
        NewPilot::builder()
            .name("Harbor Clinic Rotation")
            .org_name("Harbor Health")
            .pilot_type(PilotType::Healthcare)
            .region("Pacific")
            .primary_objective("Lower night-shift burnout")
            .majority_logic_desc("Shifts assigned by seniority vote")
            .qi_logic_desc("Shifts weighted by recovery need")
    }

    #[test]
    fn test_builder_success() {
        let fields = full_builder().build().unwrap();
        assert_eq!(fields.name, "Harbor Clinic Rotation");
        assert_eq!(fields.pilot_type, PilotType::Healthcare);
    }

    #[test]
    fn test_builder_missing_field() {
        let err = NewPilot::builder().name("only a name").build().unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field } if field == "org_name"));
    }

    #[test]
    fn test_builder_accepts_empty_strings() {
        let fields = full_builder().region("").build().unwrap();
        assert!(fields.region.is_empty());
    }

    #[test]
    fn test_draft_has_no_result() {
        let pilot = PilotProject::draft(full_builder().build().unwrap());
        assert_eq!(pilot.status, PilotStatus::Draft);
        assert!(pilot.simulation_result.is_none());
        assert!(!pilot.is_completed());
        assert!(!pilot.id.is_nil());
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        use PilotStatus::{Completed, Configured, Draft, Running};

        assert!(Draft.can_transition_to(Configured));
        assert!(Draft.can_transition_to(Running));
        assert!(Draft.can_transition_to(Completed));
        assert!(Configured.can_transition_to(Completed));
        assert!(Running.can_transition_to(Completed));

        assert!(!Draft.can_transition_to(Draft));
        assert!(!Running.can_transition_to(Configured));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Completed));
        assert!(Completed.is_terminal());
    }

    #[test]
    fn test_wire_shape() {
        let pilot = PilotProject::draft(full_builder().build().unwrap());
        let json = serde_json::to_value(&pilot).unwrap();
        assert_eq!(json["type"], "HEALTHCARE");
        assert_eq!(json["status"], "DRAFT");
        assert_eq!(json["orgName"], "Harbor Health");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("simulationResult").is_none());
    }

    #[test]
    fn test_new_pilot_deserializes_from_camel_case() {
        let fields: NewPilot = serde_json::from_value(serde_json::json!({
            "name": "Neo-Tokyo Transit Grid",
            "orgName": "Neo-Tokyo Metro Authority",
            "type": "CITY",
            "region": "Kanto",
            "primaryObjective": "Reduce commuter burnout",
            "majorityLogicDesc": "Majority vote",
            "qiLogicDesc": "Least-served first"
        }))
        .unwrap();
        assert_eq!(fields.pilot_type, PilotType::City);
        assert_eq!(fields.org_name, "Neo-Tokyo Metro Authority");
    }
}
