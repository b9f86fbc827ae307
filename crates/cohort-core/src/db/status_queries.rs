//! Per-agent status records keyed by `(session_id, agent_id)`.

use std::collections::HashSet;

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension, Transaction};

use super::{json_column, parsed_column};
use crate::{
    error::{CohortError, DatabaseResultExt, Result},
    models::{OwnerToken, PhaseRoster, SessionStatus, StatusRecord, TaskEntry},
};

const CHECK_SESSION_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM sessions WHERE session_id = ?1)";
const SELECT_OWNER_SQL: &str =
    "SELECT owner_token FROM status_records WHERE session_id = ?1 AND agent_id = ?2";
const INSERT_STATUS_SQL: &str = "INSERT INTO status_records (session_id, agent_id, owner_token, phase, record, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const UPDATE_STATUS_SQL: &str = "UPDATE status_records SET phase = ?1, record = ?2, updated_at = ?3 WHERE session_id = ?4 AND agent_id = ?5";
const SELECT_STATUS_SQL: &str =
    "SELECT record FROM status_records WHERE session_id = ?1 AND agent_id = ?2";
const SELECT_SESSION_STATUS_SQL: &str =
    "SELECT record FROM status_records WHERE session_id = ?1 ORDER BY rowid";
const SELECT_ROSTER_SQL: &str = "SELECT roster, status FROM sessions WHERE session_id = ?1";
const UPDATE_ROSTER_SQL: &str =
    "UPDATE sessions SET roster = ?1, updated_at = ?2 WHERE session_id = ?3";

/// Tasks an agent asks for when it joins a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskClaim {
    /// Exactly these tasks; rejected if another agent already holds one
    Exact(Vec<String>),
    /// Whichever of these tasks no other agent holds yet
    Remaining(Vec<String>),
}

impl super::Database {
    /// Stores a new status record and issues its owner token.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SchemaViolation`] if the record is invalid
    /// * [`CohortError::SessionNotFound`] if the session does not exist
    /// * [`CohortError::InvalidInput`] if the agent already has a record
    pub fn register_status_record(&mut self, record: &StatusRecord) -> Result<OwnerToken> {
        record.validate()?;
        let document = serde_json::to_string(record)?;
        let token = OwnerToken::generate();

        let tx = self.begin()?;

        let session_exists: bool = tx
            .query_row(CHECK_SESSION_EXISTS_SQL, params![&record.session_id], |row| row.get(0))
            .db_context("Failed to check session existence")?;
        if !session_exists {
            return Err(CohortError::SessionNotFound {
                session_id: record.session_id.clone(),
            });
        }

        let existing: Option<String> = tx
            .query_row(
                SELECT_OWNER_SQL,
                params![&record.session_id, &record.agent_id],
                |row| row.get(0),
            )
            .optional()
            .db_context("Failed to check status record")?;
        if existing.is_some() {
            return Err(CohortError::invalid_input("agent_id").with_reason(format!(
                "agent {} already has a status record in session {}",
                record.agent_id, record.session_id
            )));
        }

        Self::insert_status_record(&tx, record, &document, &token)?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(token)
    }

    /// Adds an agent to a phase of a `planning` session.
    ///
    /// The roster is re-read, the claimed tasks are checked against every
    /// other record, and the record and roster entry are written in one
    /// transaction, so concurrent joins never share a task or lose an entry.
    /// Returns the stored record with its resolved task list.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SessionNotFound`] if the session does not exist
    /// * [`CohortError::SessionState`] unless the session is `planning`
    /// * [`CohortError::InvalidInput`] for an unknown phase, an agent already
    ///   on the roster or an [`TaskClaim::Exact`] task held by another agent
    /// * [`CohortError::SchemaViolation`] if the resulting record is invalid
    pub fn join_session(
        &mut self,
        mut record: StatusRecord,
        claim: TaskClaim,
    ) -> Result<(StatusRecord, OwnerToken)> {
        let token = OwnerToken::generate();
        let tx = self.begin()?;

        let (mut roster, status): (Vec<PhaseRoster>, SessionStatus) = tx
            .query_row(SELECT_ROSTER_SQL, params![&record.session_id], |row| {
                Ok((json_column(row, 0)?, parsed_column(row, 1)?))
            })
            .optional()
            .db_context("Failed to read session roster")?
            .ok_or_else(|| CohortError::SessionNotFound {
                session_id: record.session_id.clone(),
            })?;

        if status != SessionStatus::Planning {
            return Err(CohortError::SessionState {
                session_id: record.session_id.clone(),
                status: status.as_str().to_string(),
                reason: "agents can only join while planning".to_string(),
            });
        }
        if roster.iter().any(|entry| entry.agents.contains(&record.agent_id)) {
            return Err(CohortError::invalid_input("agent_id").with_reason(format!(
                "agent {} is already assigned in session {}",
                record.agent_id, record.session_id
            )));
        }
        let entry = roster
            .iter_mut()
            .find(|entry| entry.phase == record.phase)
            .ok_or_else(|| {
                CohortError::invalid_input("phase").with_reason(format!(
                    "phase '{}' is not part of session {}",
                    record.phase, record.session_id
                ))
            })?;

        let taken = Self::assigned_tasks(&tx, &record.session_id)?;
        let tasks = match claim {
            TaskClaim::Exact(tasks) => {
                if let Some(task_id) = tasks.iter().find(|task_id| taken.contains(*task_id)) {
                    return Err(CohortError::invalid_input("tasks")
                        .with_reason(format!("task {task_id} is already assigned")));
                }
                tasks
            }
            TaskClaim::Remaining(tasks) => tasks
                .into_iter()
                .filter(|task_id| !taken.contains(task_id))
                .collect(),
        };
        record.tasks = tasks.into_iter().map(TaskEntry::new).collect();
        record.validate()?;

        entry.agents.push(record.agent_id.clone());
        let document = serde_json::to_string(&record)?;
        let roster = serde_json::to_string(&roster)?;

        Self::insert_status_record(&tx, &record, &document, &token)?;
        tx.execute(
            UPDATE_ROSTER_SQL,
            params![&roster, Timestamp::now().to_string(), &record.session_id],
        )
        .db_context("Failed to update roster")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok((record, token))
    }

    fn insert_status_record(
        tx: &Transaction,
        record: &StatusRecord,
        document: &str,
        token: &OwnerToken,
    ) -> Result<()> {
        tx.execute(
            INSERT_STATUS_SQL,
            params![
                &record.session_id,
                &record.agent_id,
                token.to_string(),
                &record.phase,
                document,
                Timestamp::now().to_string(),
            ],
        )
        .db_context("Failed to insert status record")?;
        Ok(())
    }

    /// Task ids already held by some agent of the session.
    fn assigned_tasks(tx: &Transaction, session_id: &str) -> Result<HashSet<String>> {
        let mut stmt = tx
            .prepare(SELECT_SESSION_STATUS_SQL)
            .db_context("Failed to prepare query")?;
        let records = stmt
            .query_map(params![session_id], |row| json_column::<StatusRecord>(row, 0))
            .db_context("Failed to query status records")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to collect status records")?;

        Ok(records
            .into_iter()
            .flat_map(|record| record.tasks.into_iter().map(|task| task.id))
            .collect())
    }

    /// Atomically replaces a status record on behalf of its owner.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SchemaViolation`] if the record is invalid; nothing is
    ///   written
    /// * [`CohortError::AgentNotFound`] if the record was never registered
    /// * [`CohortError::OwnershipViolation`] if `token` is not the owner's
    /// * [`CohortError::StaleRecord`] if the write would drop history,
    ///   outputs or a completed task already in the store
    pub fn save_status_record(&mut self, record: &StatusRecord, token: &OwnerToken) -> Result<()> {
        record.validate()?;
        let document = serde_json::to_string(record)?;

        let tx = self.begin()?;

        Self::check_owner_in(&tx, &record.session_id, &record.agent_id, token)?;

        let stored: StatusRecord = tx
            .query_row(
                SELECT_STATUS_SQL,
                params![&record.session_id, &record.agent_id],
                |row| json_column(row, 0),
            )
            .db_context("Failed to read stored status record")?;
        if !record.extends(&stored) {
            return Err(CohortError::StaleRecord {
                session_id: record.session_id.clone(),
                agent_id: record.agent_id.clone(),
            });
        }

        tx.execute(
            UPDATE_STATUS_SQL,
            params![
                &record.phase,
                &document,
                Timestamp::now().to_string(),
                &record.session_id,
                &record.agent_id,
            ],
        )
        .db_context("Failed to update status record")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(())
    }

    /// Confirms that `token` owns the agent's record.
    pub fn verify_owner(&self, session_id: &str, agent_id: &str, token: &OwnerToken) -> Result<()> {
        Self::check_owner_in(&self.connection, session_id, agent_id, token)
    }

    fn check_owner_in(
        connection: &rusqlite::Connection,
        session_id: &str,
        agent_id: &str,
        token: &OwnerToken,
    ) -> Result<()> {
        let owner: Option<String> = connection
            .query_row(SELECT_OWNER_SQL, params![session_id, agent_id], |row| row.get(0))
            .optional()
            .db_context("Failed to read owner token")?;

        match owner {
            None => Err(CohortError::AgentNotFound {
                session_id: session_id.to_string(),
                agent_id: agent_id.to_string(),
            }),
            Some(owner) if owner == token.to_string() => Ok(()),
            Some(_) => Err(CohortError::OwnershipViolation {
                session_id: session_id.to_string(),
                agent_id: agent_id.to_string(),
            }),
        }
    }

    /// Reads one agent's status record.
    pub fn get_status_record(&self, session_id: &str, agent_id: &str) -> Result<Option<StatusRecord>> {
        self.connection
            .query_row(SELECT_STATUS_SQL, params![session_id, agent_id], |row| {
                json_column(row, 0)
            })
            .optional()
            .db_context("Failed to query status record")
    }

    /// Reads every status record of a session in registration order.
    pub fn list_status_records(&self, session_id: &str) -> Result<Vec<StatusRecord>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_SESSION_STATUS_SQL)
            .db_context("Failed to prepare query")?;

        let records = stmt
            .query_map(params![session_id], |row| json_column(row, 0))
            .db_context("Failed to query status records")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to collect status records")?;

        Ok(records)
    }
}
