//! Session roster, lifecycle status and phase markers.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension, Transaction};

use super::{json_column, parsed_column, timestamp_column};
use crate::{
    error::{CohortError, DatabaseResultExt, Result},
    models::{PhaseMarker, PhaseRoster, SessionRecord, SessionStatus},
};

const CHECK_PLAN_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM plans WHERE workorder_id = ?1)";
const CHECK_SESSION_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM sessions WHERE session_id = ?1)";
const INSERT_SESSION_SQL: &str = "INSERT INTO sessions (session_id, workorder_id, roster, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const SELECT_SESSION_SQL: &str = "SELECT session_id, workorder_id, roster, status, created_at, updated_at FROM sessions WHERE session_id = ?1";
const SELECT_ACTIVE_SESSIONS_SQL: &str = "SELECT session_id, workorder_id, roster, status, created_at, updated_at FROM sessions WHERE status != 'archived' ORDER BY created_at DESC, session_id";
const SELECT_ALL_SESSIONS_SQL: &str = "SELECT session_id, workorder_id, roster, status, created_at, updated_at FROM sessions ORDER BY created_at DESC, session_id";
const SELECT_MARKERS_SQL: &str =
    "SELECT phase, passed_at FROM phase_markers WHERE session_id = ?1 ORDER BY passed_at, rowid";
const UPDATE_SESSION_STATUS_SQL: &str =
    "UPDATE sessions SET status = ?1, updated_at = ?2 WHERE session_id = ?3";
const CHECK_MARKER_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM phase_markers WHERE session_id = ?1 AND phase = ?2)";
const INSERT_MARKER_SQL: &str =
    "INSERT INTO phase_markers (session_id, phase, passed_at) VALUES (?1, ?2, ?3)";
const TOUCH_SESSION_SQL: &str = "UPDATE sessions SET updated_at = ?1 WHERE session_id = ?2";

impl super::Database {
    fn build_session_from_row(row: &rusqlite::Row) -> rusqlite::Result<SessionRecord> {
        Ok(SessionRecord {
            session_id: row.get(0)?,
            workorder_id: parsed_column(row, 1)?,
            phases: json_column::<Vec<PhaseRoster>>(row, 2)?,
            status: parsed_column(row, 3)?,
            completed_phases: Vec::new(),
            created_at: timestamp_column(row, 4)?,
            updated_at: timestamp_column(row, 5)?,
        })
    }

    fn load_markers(&self, session: &mut SessionRecord) -> Result<()> {
        let mut stmt = self
            .connection
            .prepare(SELECT_MARKERS_SQL)
            .db_context("Failed to prepare query")?;

        session.completed_phases = stmt
            .query_map(params![&session.session_id], |row| {
                Ok(PhaseMarker {
                    phase: row.get(0)?,
                    passed_at: timestamp_column(row, 1)?,
                })
            })
            .db_context("Failed to query phase markers")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to collect phase markers")?;

        Ok(())
    }

    fn ensure_session_exists(tx: &Transaction, session_id: &str) -> Result<()> {
        let exists: bool = tx
            .query_row(CHECK_SESSION_EXISTS_SQL, params![session_id], |row| row.get(0))
            .db_context("Failed to check session existence")?;
        if exists {
            Ok(())
        } else {
            Err(CohortError::SessionNotFound {
                session_id: session_id.to_string(),
            })
        }
    }

    /// Stores a new session roster.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SchemaViolation`] if the roster is invalid
    /// * [`CohortError::PlanNotFound`] if the plan is not stored
    /// * [`CohortError::InvalidInput`] if the session id is taken
    pub fn create_session(&mut self, session: &SessionRecord) -> Result<()> {
        session.validate()?;
        let roster = serde_json::to_string(&session.phases)?;

        let tx = self.begin()?;

        let plan_exists: bool = tx
            .query_row(
                CHECK_PLAN_EXISTS_SQL,
                params![session.workorder_id.as_str()],
                |row| row.get(0),
            )
            .db_context("Failed to check plan existence")?;
        if !plan_exists {
            return Err(CohortError::PlanNotFound {
                workorder_id: session.workorder_id.to_string(),
            });
        }

        if Self::ensure_session_exists(&tx, &session.session_id).is_ok() {
            return Err(CohortError::invalid_input("session_id")
                .with_reason(format!("session {} already exists", session.session_id)));
        }

        tx.execute(
            INSERT_SESSION_SQL,
            params![
                &session.session_id,
                session.workorder_id.as_str(),
                &roster,
                session.status.as_str(),
                session.created_at.to_string(),
                session.updated_at.to_string(),
            ],
        )
        .db_context("Failed to insert session")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(())
    }

    /// Retrieves a session with its phase markers.
    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let session = self
            .connection
            .query_row(SELECT_SESSION_SQL, params![session_id], Self::build_session_from_row)
            .optional()
            .db_context("Failed to query session")?;

        match session {
            Some(mut session) => {
                self.load_markers(&mut session)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Lists sessions, newest first. Archived sessions are skipped unless
    /// `include_archived` is set.
    pub fn list_sessions(&self, include_archived: bool) -> Result<Vec<SessionRecord>> {
        let sql = if include_archived {
            SELECT_ALL_SESSIONS_SQL
        } else {
            SELECT_ACTIVE_SESSIONS_SQL
        };
        let mut stmt = self
            .connection
            .prepare(sql)
            .db_context("Failed to prepare query")?;

        let mut sessions = stmt
            .query_map([], Self::build_session_from_row)
            .db_context("Failed to query sessions")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to collect sessions")?;
        drop(stmt);

        for session in &mut sessions {
            self.load_markers(session)?;
        }
        Ok(sessions)
    }

    /// Moves a session to `status`.
    pub fn set_session_status(&mut self, session_id: &str, status: SessionStatus) -> Result<()> {
        let updated = self
            .connection
            .execute(
                UPDATE_SESSION_STATUS_SQL,
                params![status.as_str(), Timestamp::now().to_string(), session_id],
            )
            .db_context("Failed to update session status")?;

        if updated == 0 {
            return Err(CohortError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }
        Ok(())
    }

    /// Appends a completion marker for `phase`.
    ///
    /// Markers are never rewritten; marking a phase twice is rejected.
    pub fn append_phase_marker(
        &mut self,
        session_id: &str,
        phase: &str,
        passed_at: Timestamp,
    ) -> Result<PhaseMarker> {
        let tx = self.begin()?;
        Self::ensure_session_exists(&tx, session_id)?;

        let exists: bool = tx
            .query_row(CHECK_MARKER_EXISTS_SQL, params![session_id, phase], |row| row.get(0))
            .db_context("Failed to check phase marker")?;
        if exists {
            return Err(CohortError::invalid_input("phase")
                .with_reason(format!("phase '{phase}' is already marked complete")));
        }

        let passed_at_str = passed_at.to_string();
        tx.execute(INSERT_MARKER_SQL, params![session_id, phase, &passed_at_str])
            .db_context("Failed to append phase marker")?;
        tx.execute(TOUCH_SESSION_SQL, params![&passed_at_str, session_id])
            .db_context("Failed to update session timestamp")?;
        tx.commit().db_context("Failed to commit transaction")?;

        Ok(PhaseMarker {
            phase: phase.to_string(),
            passed_at,
        })
    }

    /// Marks a session archived. Rows are retained.
    pub fn archive_session(&mut self, session_id: &str) -> Result<()> {
        self.set_session_status(session_id, SessionStatus::Archived)
    }
}
