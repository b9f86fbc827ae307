//! Parameter structures for Cohort operations.
//!
//! These are shared by every interface (CLI, MCP) and carry no framework
//! derives beyond serde. Interfaces wrap them:
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   CLI Args      │    │   MCP Params    │    │  Core Params    │
//! │  (clap derives) │───▶│ (serde derives) │───▶│ (minimal deps)  │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! CLI argument structs convert with `From`, MCP requests deserialize through
//! a `#[serde(transparent)]` wrapper. JSON schemas are derived only with the
//! `schema` feature.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identifies a stored plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PlanRef {
    /// Work-order id of the plan, e.g. `WO-AUTH-001`
    pub workorder_id: String,
}

/// Parameters for scoring a plan.
///
/// Exactly one of `workorder_id` (a stored plan; the score is recorded) or
/// `document` (raw JSON; nothing is stored) must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ValidatePlan {
    /// Work-order id of a stored plan
    #[serde(default)]
    pub workorder_id: Option<String>,
    /// Plan document as JSON text
    #[serde(default)]
    pub document: Option<String>,
}

/// Identifies a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SessionRef {
    /// Session identifier
    pub session_id: String,
}

/// Parameters for creating a session over a passing plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CreateSession {
    /// Plan to execute; its stored validation must have passed
    pub workorder_id: String,
    /// Session id; generated when omitted
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Parameters for listing sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ListSessions {
    /// Include archived sessions
    #[serde(default)]
    pub archived: bool,
}

/// Parameters for assigning an agent to a phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct AssignAgent {
    pub session_id: String,
    pub agent_id: String,
    /// Phase the agent works in
    pub phase: String,
    /// Plan task ids; empty means every not-yet-assigned task of the phase
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Paths the agent must never modify
    #[serde(default)]
    pub forbidden_paths: Vec<String>,
    /// Paths the agent intends to write
    #[serde(default)]
    pub claimed_paths: Vec<String>,
}

/// Parameters for evaluating a phase gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CheckGate {
    pub session_id: String,
    /// Phase to check; defaults to the currently authorised phase
    #[serde(default)]
    pub phase: Option<String>,
}

/// Parameters for an owner-authorised task status change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SetTaskStatus {
    pub session_id: String,
    pub agent_id: String,
    /// Owner token issued when the agent was assigned
    pub token: String,
    pub task_id: String,
    /// not_started, in_progress, blocked or complete (common aliases accepted)
    pub status: String,
    /// Optional note stored in the history entry
    #[serde(default)]
    pub note: Option<String>,
}

/// Parameters for recording an agent deliverable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RecordOutput {
    pub session_id: String,
    pub agent_id: String,
    /// Owner token issued when the agent was assigned
    pub token: String,
    /// Description of what was delivered
    pub output: String,
}

/// Parameters for exporting a session as JSON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ExportSession {
    pub session_id: String,
    /// Root directory; files land in `<directory>/<session_id>/`
    pub directory: String,
}

/// Parameters for archiving a completed session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ArchiveSession {
    pub session_id: String,
    /// Export root; the archive lands in `<directory>/archive/<session_id>/`
    #[serde(default)]
    pub directory: Option<String>,
}
