//! Phase gate: read-only check that a phase is finished.
//!
//! The gate never mutates anything and holds no state, so it can be polled
//! as often as needed. A failed gate lists exactly which agent/task pairs are
//! holding the phase back.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::{SessionRecord, StatusRecord, TaskStatus};

/// Why an agent is holding a phase back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum BlockerReason {
    /// Task is not finished yet
    Incomplete(TaskStatus),
    /// Task is explicitly blocked
    Blocked,
    /// Agent is on the roster but has no status record
    MissingRecord,
}

/// One outstanding item preventing a phase from advancing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    pub agent_id: String,
    /// `None` when the whole agent is missing
    pub task_id: Option<String>,
    pub reason: BlockerReason,
}

/// Result of evaluating one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub phase: String,
    pub advance: bool,
    pub blockers: Vec<Blocker>,
    pub warnings: Vec<String>,
}

/// Decides whether `phase` of `session` may hand over to the next phase.
///
/// True iff every agent assigned to the phase has all tasks `complete`
/// (which also means none is `blocked`). A phase without agents is
/// advanceable with a warning. `records` may contain records of other
/// phases; they are ignored.
pub fn can_advance(session: &SessionRecord, records: &[StatusRecord], phase: &str) -> GateOutcome {
    let mut outcome = GateOutcome {
        phase: phase.to_string(),
        advance: false,
        blockers: Vec::new(),
        warnings: Vec::new(),
    };

    let Some(agents) = session.agents_in(phase) else {
        let message = format!(
            "phase '{phase}' is not part of session {}",
            session.session_id
        );
        warn!("{message}");
        outcome.warnings.push(message);
        return outcome;
    };

    if agents.is_empty() {
        let message = format!("phase '{phase}' has no assigned agents; advancing vacuously");
        warn!("{message}");
        outcome.warnings.push(message);
        outcome.advance = true;
        return outcome;
    }

    let by_agent: HashMap<&str, &StatusRecord> = records
        .iter()
        .filter(|record| record.session_id == session.session_id)
        .map(|record| (record.agent_id.as_str(), record))
        .collect();

    for agent_id in agents {
        let Some(record) = by_agent.get(agent_id.as_str()) else {
            outcome.blockers.push(Blocker {
                agent_id: agent_id.clone(),
                task_id: None,
                reason: BlockerReason::MissingRecord,
            });
            continue;
        };

        if record.phase != phase {
            outcome.warnings.push(format!(
                "agent {agent_id} is on the '{phase}' roster but its record says '{}'",
                record.phase
            ));
        }

        for task in &record.tasks {
            let reason = match task.status {
                TaskStatus::Complete => continue,
                TaskStatus::Blocked => BlockerReason::Blocked,
                other => BlockerReason::Incomplete(other),
            };
            outcome.blockers.push(Blocker {
                agent_id: agent_id.clone(),
                task_id: Some(task.id.clone()),
                reason,
            });
        }
    }

    outcome.advance = outcome.blockers.is_empty();
    outcome
}
