//! Session summary types and functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{SessionRecord, SessionStatus, WorkorderId};

/// Compact view of a session for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session ID
    pub session_id: String,
    /// Plan being executed
    pub workorder_id: WorkorderId,
    /// Session status
    pub status: SessionStatus,
    /// Number of phases
    pub total_phases: u32,
    /// Number of phases whose gate has passed
    pub completed_phases: u32,
    /// Number of assigned agents
    pub agents: u32,
    /// Phase currently authorised for work
    pub authorized_phase: Option<String>,
    /// Creation timestamp
    pub created_at: Timestamp,
    /// Last update timestamp
    pub updated_at: Timestamp,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(session: &SessionRecord) -> Self {
        Self {
            session_id: session.session_id.clone(),
            workorder_id: session.workorder_id.clone(),
            status: session.status,
            total_phases: session.phases.len() as u32,
            completed_phases: session.completed_phases.len() as u32,
            agents: session.all_agents().count() as u32,
            authorized_phase: session.authorized_phase().map(String::from),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
