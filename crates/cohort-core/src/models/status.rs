//! Status enumerations for tasks and sessions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single task in an agent's status record.
///
/// Serialisation always writes the canonical snake_case name. Reads accept a
/// small set of known aliases (`done`, `pending`, ...) so that hand-edited or
/// older records still load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Work has not begun
    #[default]
    #[serde(alias = "pending", alias = "todo")]
    NotStarted,

    /// Agent is actively working on the task
    #[serde(alias = "inprogress", alias = "in-progress", alias = "started")]
    InProgress,

    /// Agent cannot proceed; may return to in_progress
    Blocked,

    /// Terminal success state
    #[serde(alias = "done", alias = "finished", alias = "completed")]
    Complete,
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not_started" | "pending" | "todo" => Ok(TaskStatus::NotStarted),
            "in_progress" | "inprogress" | "in-progress" | "started" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "complete" | "done" | "finished" | "completed" => Ok(TaskStatus::Complete),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

impl TaskStatus {
    /// Canonical string written to records.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Complete => "complete",
        }
    }

    /// Whether the status can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Forward moves along `not_started → in_progress → complete` are allowed
    /// (including skipping `in_progress`). `blocked` may be entered from any
    /// non-terminal state and left only towards `in_progress`.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::{Blocked, Complete, InProgress, NotStarted};

        matches!(
            (self, next),
            (NotStarted, InProgress)
                | (NotStarted, Complete)
                | (InProgress, Complete)
                | (NotStarted, Blocked)
                | (InProgress, Blocked)
                | (Blocked, InProgress)
        )
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cohort_core::models::TaskStatus;
    ///
    /// assert_eq!(TaskStatus::Complete.with_icon(), "✓ Complete");
    /// assert_eq!(TaskStatus::Blocked.with_icon(), "✗ Blocked");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            TaskStatus::Complete => "✓ Complete",
            TaskStatus::InProgress => "➤ In Progress",
            TaskStatus::Blocked => "✗ Blocked",
            TaskStatus::NotStarted => "○ Not Started",
        }
    }
}

/// Lifecycle of a multi-agent session, owned by the coordinator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Roster is being assembled; conflict audit not yet passed
    #[default]
    Planning,

    /// Conflict audit passed; execution may start
    Audited,

    /// Agents are executing phases
    Running,

    /// Final phase gate has passed
    Complete,

    /// Synthesised and moved out of the active view
    Archived,
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(SessionStatus::Planning),
            "audited" => Ok(SessionStatus::Audited),
            "running" => Ok(SessionStatus::Running),
            "complete" => Ok(SessionStatus::Complete),
            "archived" => Ok(SessionStatus::Archived),
            _ => Err(format!("Invalid session status: {s}")),
        }
    }
}

impl SessionStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Planning => "planning",
            SessionStatus::Audited => "audited",
            SessionStatus::Running => "running",
            SessionStatus::Complete => "complete",
            SessionStatus::Archived => "archived",
        }
    }
}
