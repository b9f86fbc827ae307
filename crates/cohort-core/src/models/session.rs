//! Session roster model.

use std::collections::HashSet;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{SessionStatus, WorkorderId};
use crate::error::{CohortError, Result};

const RECORD: &str = "session record";

/// Roster of one multi-agent session, written only by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    /// Unique session identifier
    pub session_id: String,

    /// Plan executed by this session
    pub workorder_id: WorkorderId,

    /// Phases in execution order with their assigned agents
    pub phases: Vec<PhaseRoster>,

    /// Overall lifecycle state
    #[serde(default)]
    pub status: SessionStatus,

    /// Append-only markers for phases whose gate has passed
    #[serde(default)]
    pub completed_phases: Vec<PhaseMarker>,

    /// Timestamp when the session was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the session was last modified (UTC)
    pub updated_at: Timestamp,
}

/// Agents assigned to one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseRoster {
    pub phase: String,
    #[serde(default)]
    pub agents: Vec<String>,
}

/// Records that a phase gate passed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseMarker {
    pub phase: String,
    pub passed_at: Timestamp,
}

impl SessionRecord {
    /// Creates a session in `planning` with empty rosters for `phases`.
    pub fn new(
        session_id: impl Into<String>,
        workorder_id: WorkorderId,
        phases: impl IntoIterator<Item = String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            session_id: session_id.into(),
            workorder_id,
            phases: phases
                .into_iter()
                .map(|phase| PhaseRoster {
                    phase,
                    agents: Vec::new(),
                })
                .collect(),
            status: SessionStatus::Planning,
            completed_phases: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Agents assigned to `phase`, or `None` when the phase is unknown.
    pub fn agents_in(&self, phase: &str) -> Option<&[String]> {
        self.phases
            .iter()
            .find(|roster| roster.phase == phase)
            .map(|roster| roster.agents.as_slice())
    }

    /// Every agent across all phases, in roster order.
    pub fn all_agents(&self) -> impl Iterator<Item = &String> {
        self.phases.iter().flat_map(|roster| roster.agents.iter())
    }

    /// Phase names in execution order.
    pub fn phase_names(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|roster| roster.phase.as_str())
    }

    /// Last phase in execution order.
    pub fn final_phase(&self) -> Option<&str> {
        self.phases.last().map(|roster| roster.phase.as_str())
    }

    /// Whether a completion marker exists for `phase`.
    pub fn is_phase_complete(&self, phase: &str) -> bool {
        self.completed_phases.iter().any(|marker| marker.phase == phase)
    }

    /// First phase without a completion marker; the only phase whose work is
    /// currently authorised.
    pub fn authorized_phase(&self) -> Option<&str> {
        self.phase_names()
            .find(|phase| !self.is_phase_complete(phase))
    }

    /// Checks the record against the store schema.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::SchemaViolation`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(CohortError::schema(RECORD, "session_id").with_reason("must not be empty"));
        }
        if self.phases.is_empty() {
            return Err(CohortError::schema(RECORD, "phases").with_reason("at least one phase is required"));
        }

        let mut phases = HashSet::new();
        let mut agents = HashSet::new();
        for roster in &self.phases {
            if roster.phase.trim().is_empty() {
                return Err(CohortError::schema(RECORD, "phases.phase").with_reason("must not be empty"));
            }
            if !phases.insert(roster.phase.as_str()) {
                return Err(CohortError::schema(RECORD, "phases.phase")
                    .with_reason(format!("duplicate phase '{}'", roster.phase)));
            }
            for agent in &roster.agents {
                if !agents.insert(agent.as_str()) {
                    return Err(CohortError::schema(RECORD, "phases.agents")
                        .with_reason(format!("agent '{agent}' is assigned more than once")));
                }
            }
        }

        for marker in &self.completed_phases {
            if !phases.contains(marker.phase.as_str()) {
                return Err(CohortError::schema(RECORD, "completed_phases")
                    .with_reason(format!("unknown phase '{}'", marker.phase)));
            }
        }

        Ok(())
    }
}
