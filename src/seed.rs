//! Demo seed set loaded on service start.

use crate::error::PilotResult;
use crate::pilot::{NewPilot, PilotType};
use crate::simulation::SimulationResult;
use crate::storage::{CommitToken, PilotStore};

/// Fixed demo pilots, oldest first.
///
/// The first entry is committed to `Completed` by [`load_demo_pilots`].
#[must_use]
pub fn demo_pilots() -> Vec<NewPilot> {
    vec![
        NewPilot {
            name: "Riverside Care Rotation".to_string(),
            org_name: "Riverside Community Health".to_string(),
            pilot_type: PilotType::Healthcare,
            region: "Pacific Northwest".to_string(),
            primary_objective: "Cut night-shift burnout without growing patient wait times"
                .to_string(),
            majority_logic_desc: "Shift schedules are set by a staff-wide majority vote."
                .to_string(),
            qi_logic_desc: "Schedules weight the recovery needs of the most-exhausted teams first."
                .to_string(),
        },
        NewPilot {
            name: "Helix Product Council".to_string(),
            org_name: "Helix Labs".to_string(),
            pilot_type: PilotType::Enterprise,
            region: "Northern Europe".to_string(),
            primary_objective: "Ship faster while lowering compliance exposure".to_string(),
            majority_logic_desc: "Roadmap priorities follow the largest customer segment."
                .to_string(),
            qi_logic_desc: "Roadmap gates require sign-off from the most affected support teams."
                .to_string(),
        },
        NewPilot {
            name: "Lagos Market Lanes".to_string(),
            org_name: "Lagos Urban Mobility Office".to_string(),
            pilot_type: PilotType::City,
            region: "West Africa".to_string(),
            primary_objective: "Reduce congestion around the central markets".to_string(),
            majority_logic_desc: "Lane allocation follows peak-hour vehicle counts.".to_string(),
            qi_logic_desc: "Lane allocation starts from vendors and pedestrians with no vehicle."
                .to_string(),
        },
    ]
}

/// Load the demo set into `store`. Returns how many pilots were created.
pub fn load_demo_pilots(store: &dyn PilotStore) -> PilotResult<usize> {
    let mut created = 0;
    for (i, fields) in demo_pilots().into_iter().enumerate() {
        let pilot = store.create(fields)?;
        if i == 0 {
            store.apply_result(
                pilot.id,
                SimulationResult::baseline(),
                CommitToken::new(),
            )?;
        }
        created += 1;
    }
    Ok(created)
}
