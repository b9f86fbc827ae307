//! Per-agent task lifecycle.
//!
//! A [`TaskTracker`] owns one [`StatusRecord`] and is the only way its task
//! states change. Every accepted transition is appended to the record's
//! history; rejected transitions leave the record untouched.
//!
//! ```text
//! not_started ──▶ in_progress ──▶ complete (terminal)
//!      │              ▲  │
//!      └──▶ blocked ◀─┘  │
//!             └──────────┘ (unblock → in_progress)
//! ```

use jiff::Timestamp;
use log::{debug, warn};

use crate::{
    error::{CohortError, Result},
    models::{HistoryEntry, StatusRecord, TaskStatus},
};

/// State machine over one agent's status record.
#[derive(Debug, Clone)]
pub struct TaskTracker {
    record: StatusRecord,
}

impl TaskTracker {
    pub fn new(record: StatusRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &StatusRecord {
        &self.record
    }

    pub fn into_record(self) -> StatusRecord {
        self.record
    }

    /// Moves `task_id` to `new_status`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// * [`CohortError::UnknownTask`] if the agent has no such task
    /// * [`CohortError::TransitionViolation`] if the lifecycle forbids the
    ///   move, including any move out of `complete`
    pub fn set_status(
        &mut self,
        task_id: &str,
        new_status: TaskStatus,
        note: Option<String>,
    ) -> Result<HistoryEntry> {
        self.set_status_at(task_id, new_status, note, Timestamp::now())
    }

    /// Same as [`TaskTracker::set_status`] with an explicit timestamp.
    ///
    /// A timestamp earlier than the last history entry is clamped to it so
    /// the audit trail stays monotonic.
    pub fn set_status_at(
        &mut self,
        task_id: &str,
        new_status: TaskStatus,
        note: Option<String>,
        at: Timestamp,
    ) -> Result<HistoryEntry> {
        let agent_id = self.record.agent_id.clone();
        let at = match self.record.history.last() {
            Some(last) if last.at > at => last.at,
            _ => at,
        };

        let task = self
            .record
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| CohortError::UnknownTask {
                agent_id: agent_id.clone(),
                task_id: task_id.to_string(),
            })?;

        let from = task.status;
        if !from.can_transition_to(new_status) {
            warn!("Agent {agent_id} rejected transition of {task_id}: {from} -> {new_status}");
            return Err(CohortError::TransitionViolation {
                task_id: task_id.to_string(),
                from,
                to: new_status,
            });
        }

        task.status = new_status;
        if new_status == TaskStatus::Complete {
            task.completed_at = Some(at);
        }

        let entry = HistoryEntry {
            task_id: task_id.to_string(),
            from,
            to: new_status,
            at,
            note: note.filter(|n| !n.trim().is_empty()),
        };
        self.record.history.push(entry.clone());
        debug!("Agent {agent_id} moved {task_id}: {from} -> {new_status}");

        Ok(entry)
    }

    /// Appends a deliverable description used when synthesising the session.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::InvalidInput`] for blank output.
    pub fn record_output(&mut self, output: impl Into<String>) -> Result<()> {
        let output = output.into();
        if output.trim().is_empty() {
            return Err(CohortError::invalid_input("output").with_reason("output must not be empty"));
        }
        self.record.outputs.push(output);
        Ok(())
    }

    /// Completed over total tasks for this agent.
    pub fn completion_ratio(&self) -> f64 {
        self.record.completion_ratio()
    }
}
