//! Per-agent status record definition and schema checks.

use std::{collections::HashSet, fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TaskStatus, WorkorderId};
use crate::error::{CohortError, Result};

const RECORD: &str = "status record";

/// Progress ledger for one agent in one session.
///
/// Only the owning agent writes this record; everyone else reads snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    /// Owning agent
    pub agent_id: String,

    /// Session the agent is assigned to
    pub session_id: String,

    /// Back-reference to the plan being executed
    pub workorder_id: WorkorderId,

    /// Phase this agent participates in
    pub phase: String,

    /// Tasks assigned to the agent
    pub tasks: Vec<TaskEntry>,

    /// Paths the agent must never modify
    pub forbidden_paths: Vec<String>,

    /// Paths the agent intends to write
    #[serde(default)]
    pub claimed_paths: Vec<String>,

    /// Deliverables the agent recorded while working
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,

    /// Append-only audit trail of status transitions
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Status of one task inside a status record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskEntry {
    /// Task id from the plan
    pub id: String,

    /// Current lifecycle state
    #[serde(default)]
    pub status: TaskStatus,

    /// Set once, on the transition into `complete`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

/// One accepted status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub task_id: String,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Write capability for one status record.
///
/// Issued once when the record is registered; every later write must present
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerToken(Uuid);

impl OwnerToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OwnerToken {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CohortError::invalid_input("token").with_reason(e.to_string()))
    }
}

impl TaskEntry {
    /// A fresh, not-started task.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::NotStarted,
            completed_at: None,
        }
    }
}

impl StatusRecord {
    /// Creates an empty record for an agent about to start work.
    pub fn new(
        session_id: impl Into<String>,
        agent_id: impl Into<String>,
        workorder_id: WorkorderId,
        phase: impl Into<String>,
        task_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            workorder_id,
            phase: phase.into(),
            tasks: task_ids.into_iter().map(TaskEntry::new).collect(),
            forbidden_paths: Vec::new(),
            claimed_paths: Vec::new(),
            outputs: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Looks up a task entry.
    pub fn task(&self, task_id: &str) -> Option<&TaskEntry> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Completed tasks over total tasks. An agent with no tasks is done.
    pub fn completion_ratio(&self) -> f64 {
        if self.tasks.is_empty() {
            return 1.0;
        }
        let completed = self.completed_count();
        completed as f64 / self.tasks.len() as f64
    }

    /// Number of tasks in `complete`.
    pub fn completed_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Complete)
            .count()
    }

    /// Tasks currently `blocked`.
    pub fn blocked_tasks(&self) -> impl Iterator<Item = &TaskEntry> {
        self.tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Blocked)
    }

    /// Whether this record only adds to `previous`.
    ///
    /// History and outputs must extend the earlier lists entry for entry,
    /// and every task that was `complete` must still be `complete`.
    pub fn extends(&self, previous: &StatusRecord) -> bool {
        let completed_kept = previous
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Complete)
            .all(|task| {
                self.task(&task.id)
                    .is_some_and(|current| current.status == TaskStatus::Complete)
            });

        completed_kept
            && self.history.starts_with(&previous.history)
            && self.outputs.starts_with(&previous.outputs)
    }

    /// Checks the record against the store schema.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::SchemaViolation`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.agent_id.trim().is_empty() {
            return Err(CohortError::schema(RECORD, "agent_id").with_reason("must not be empty"));
        }
        if self.session_id.trim().is_empty() {
            return Err(CohortError::schema(RECORD, "session_id").with_reason("must not be empty"));
        }
        if self.phase.trim().is_empty() {
            return Err(CohortError::schema(RECORD, "phase").with_reason("must not be empty"));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(CohortError::schema(RECORD, "tasks.id").with_reason("must not be empty"));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(CohortError::schema(RECORD, "tasks.id")
                    .with_reason(format!("duplicate task id '{}'", task.id)));
            }
            match (task.status, task.completed_at) {
                (TaskStatus::Complete, None) => {
                    return Err(CohortError::schema(RECORD, "tasks.completed_at")
                        .with_reason(format!("task '{}' is complete without a timestamp", task.id)));
                }
                (status, Some(_)) if status != TaskStatus::Complete => {
                    return Err(CohortError::schema(RECORD, "tasks.completed_at").with_reason(
                        format!("task '{}' has a completion time but is {}", task.id, status),
                    ));
                }
                _ => {}
            }
        }

        for path in self.forbidden_paths.iter().chain(&self.claimed_paths) {
            if path.trim().is_empty() {
                return Err(CohortError::schema(RECORD, "paths").with_reason("empty path entry"));
            }
        }

        for pair in self.history.windows(2) {
            if pair[1].at < pair[0].at {
                return Err(CohortError::schema(RECORD, "history.at")
                    .with_reason("history timestamps must be monotonic"));
            }
        }
        for entry in &self.history {
            if !seen.contains(entry.task_id.as_str()) {
                return Err(CohortError::schema(RECORD, "history.task_id")
                    .with_reason(format!("unknown task '{}'", entry.task_id)));
            }
        }

        Ok(())
    }
}
