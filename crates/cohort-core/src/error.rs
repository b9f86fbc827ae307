//! Error types for the coordination library.

use std::path::PathBuf;

use thiserror::Error;

use crate::{gate::Blocker, models::TaskStatus};

/// Comprehensive error type for all record-store and coordination operations.
#[derive(Error, Debug)]
pub enum CohortError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Plan not found for the given work-order ID
    #[error("Plan {workorder_id} not found")]
    PlanNotFound { workorder_id: String },
    /// Session not found for the given ID
    #[error("Session {session_id} not found")]
    SessionNotFound { session_id: String },
    /// No status record exists for the agent in the session
    #[error("Agent {agent_id} has no status record in session {session_id}")]
    AgentNotFound {
        session_id: String,
        agent_id: String,
    },
    /// A record failed schema validation at the store boundary
    #[error("Schema violation in {record} field '{field}': {reason}")]
    SchemaViolation {
        record: String,
        field: String,
        reason: String,
    },
    /// A task status change that the lifecycle does not permit
    #[error("Task {task_id} cannot move from {from} to {to}")]
    TransitionViolation {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
    /// Status update for a task the agent does not own
    #[error("Agent {agent_id} has no task {task_id}")]
    UnknownTask { agent_id: String, task_id: String },
    /// Write attempted without the record's owner token
    #[error("Agent {agent_id} status record in session {session_id} is owned by another writer")]
    OwnershipViolation {
        session_id: String,
        agent_id: String,
    },
    /// Write built on a copy of the record that another writer has moved past
    #[error("Status record of agent {agent_id} in session {session_id} changed since it was read")]
    StaleRecord {
        session_id: String,
        agent_id: String,
    },
    /// Plan is immutable because execution has started
    #[error("Plan {workorder_id} is locked for execution")]
    PlanLocked { workorder_id: String },
    /// Phase gate has not passed; lists every agent/task pair holding it back
    #[error(
        "Phase '{phase}' has {} outstanding blocker(s): {}",
        .blockers.len(),
        blocker_list(.blockers)
    )]
    GateClosed {
        phase: String,
        blockers: Vec<Blocker>,
    },
    /// The conflict audit found overlapping claims
    #[error("Conflict audit for session {session_id} found {conflicts} conflict(s)")]
    ConflictsUnresolved {
        session_id: String,
        conflicts: usize,
    },
    /// Operation not permitted in the session's current state
    #[error("Session {session_id} is {status}: {reason}")]
    SessionState {
        session_id: String,
        status: String,
        reason: String,
    },
    /// Agent actor mailbox closed
    #[error("Agent {agent_id} is no longer running")]
    AgentStopped { agent_id: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

fn blocker_list(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> CohortError {
        CohortError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> CohortError {
        CohortError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

/// Builder for schema violations found at the record-store boundary.
pub struct SchemaViolationBuilder {
    record: String,
    field: String,
}

impl SchemaViolationBuilder {
    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> CohortError {
        CohortError::SchemaViolation {
            record: self.record,
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl CohortError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Creates a builder for schema violations on a record kind.
    pub fn schema(record: impl Into<String>, field: impl Into<String>) -> SchemaViolationBuilder {
        SchemaViolationBuilder {
            record: record.into(),
            field: field.into(),
        }
    }

    /// Wraps a blocking task join failure.
    pub(crate) fn join(e: tokio::task::JoinError) -> Self {
        CohortError::Configuration {
            message: format!("Task join error: {e}"),
        }
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| CohortError::database(message).with_source(e))
    }
}

/// Extension trait mapping `std::io` failures to [`CohortError::FileSystem`].
pub trait IoResultExt<T> {
    /// Attach the path the failed operation was working on.
    fn fs_context(self, path: &std::path::Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|source| CohortError::FileSystem {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Result type alias for coordination operations
pub type Result<T> = std::result::Result<T, CohortError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::BlockerReason;

    #[test]
    fn test_builders_produce_expected_variants() {
        let err = CohortError::invalid_input("phase").with_reason("must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid input for field 'phase': must not be empty"
        );

        let err = CohortError::schema("status record", "agent_id").with_reason("empty");
        assert!(matches!(err, CohortError::SchemaViolation { .. }));
        assert!(err.to_string().contains("status record"));
    }

    #[test]
    fn test_transition_violation_message() {
        let err = CohortError::TransitionViolation {
            task_id: "T-1".into(),
            from: TaskStatus::Complete,
            to: TaskStatus::InProgress,
        };
        assert_eq!(
            err.to_string(),
            "Task T-1 cannot move from complete to in_progress"
        );
    }

    #[test]
    fn test_gate_closed_names_each_blocker() {
        let err = CohortError::GateClosed {
            phase: "design".into(),
            blockers: vec![
                Blocker {
                    agent_id: "A".into(),
                    task_id: Some("AUTH-002".into()),
                    reason: BlockerReason::Blocked,
                },
                Blocker {
                    agent_id: "B".into(),
                    task_id: None,
                    reason: BlockerReason::MissingRecord,
                },
            ],
        };
        let message = err.to_string();

        assert!(message.starts_with("Phase 'design' has 2 outstanding blocker(s): "));
        assert!(message.contains("A / AUTH-002"));
        assert!(message.contains("B: no status record"));
    }

    #[test]
    fn test_fs_context_keeps_path() {
        let path = std::path::Path::new("/nonexistent/cohort");
        let err = std::fs::read_to_string(path).fs_context(path).unwrap_err();
        match err {
            CohortError::FileSystem { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
