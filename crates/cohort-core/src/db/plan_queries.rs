//! Plan storage, scoring results and execution locks.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension};

use super::{json_column, parsed_column, timestamp_column};
use crate::{
    error::{CohortError, DatabaseResultExt, Result},
    models::{PlanRecord, StoredPlan, WorkorderId},
    validator::ValidationReport,
};

const UPSERT_PLAN_SQL: &str = "INSERT INTO plans (workorder_id, title, document, last_score, last_decision, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) ON CONFLICT (workorder_id) DO UPDATE SET title = excluded.title, document = excluded.document, last_score = excluded.last_score, last_decision = excluded.last_decision, updated_at = excluded.updated_at";
const SELECT_PLAN_SQL: &str = "SELECT workorder_id, document, last_score, last_decision, locked, created_at, updated_at FROM plans WHERE workorder_id = ?1";
const SELECT_ALL_PLANS_SQL: &str = "SELECT workorder_id, document, last_score, last_decision, locked, created_at, updated_at FROM plans ORDER BY created_at DESC, workorder_id";
const SELECT_PLAN_LOCKED_SQL: &str = "SELECT locked FROM plans WHERE workorder_id = ?1";
const UPDATE_PLAN_SCORE_SQL: &str =
    "UPDATE plans SET last_score = ?1, last_decision = ?2, updated_at = ?3 WHERE workorder_id = ?4";
const LOCK_PLAN_SQL: &str = "UPDATE plans SET locked = 1, updated_at = ?1 WHERE workorder_id = ?2";

impl super::Database {
    fn build_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<StoredPlan> {
        Ok(StoredPlan {
            workorder_id: parsed_column(row, 0)?,
            plan: json_column(row, 1)?,
            last_score: row.get::<_, Option<i64>>(2)?.map(|score| score.clamp(0, 100) as u8),
            last_decision: row
                .get::<_, Option<String>>(3)?
                .map(|text| text.parse())
                .transpose()
                .map_err(|e: CohortError| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
            locked: row.get(4)?,
            created_at: timestamp_column(row, 5)?,
            updated_at: timestamp_column(row, 6)?,
        })
    }

    /// Stores a plan together with the report it was scored with.
    ///
    /// Replaces an existing, unlocked plan with the same work-order id.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SchemaViolation`] if the work-order id is malformed
    /// * [`CohortError::PlanLocked`] if a session is already executing it
    pub fn save_plan(&mut self, plan: &PlanRecord, report: &ValidationReport) -> Result<StoredPlan> {
        let workorder_id: WorkorderId = plan
            .workorder_id
            .parse()
            .map_err(|reason: String| CohortError::schema("plan record", "workorder_id").with_reason(reason))?;
        let document = serde_json::to_string(plan)?;
        let now = Timestamp::now().to_string();

        let tx = self.begin()?;

        let locked: Option<bool> = tx
            .query_row(SELECT_PLAN_LOCKED_SQL, params![workorder_id.as_str()], |row| row.get(0))
            .optional()
            .db_context("Failed to check plan lock")?;
        if locked == Some(true) {
            return Err(CohortError::PlanLocked {
                workorder_id: workorder_id.to_string(),
            });
        }

        tx.execute(
            UPSERT_PLAN_SQL,
            params![
                workorder_id.as_str(),
                &plan.title,
                &document,
                i64::from(report.score),
                report.decision.as_str(),
                &now,
            ],
        )
        .db_context("Failed to store plan")?;

        let stored = tx
            .query_row(SELECT_PLAN_SQL, params![workorder_id.as_str()], Self::build_plan_from_row)
            .db_context("Failed to read back plan")?;

        tx.commit().db_context("Failed to commit transaction")?;

        Ok(stored)
    }

    /// Records a fresh validation result without touching the document.
    pub fn record_plan_score(&mut self, workorder_id: &str, report: &ValidationReport) -> Result<()> {
        let updated = self
            .connection
            .execute(
                UPDATE_PLAN_SCORE_SQL,
                params![
                    i64::from(report.score),
                    report.decision.as_str(),
                    Timestamp::now().to_string(),
                    workorder_id
                ],
            )
            .db_context("Failed to record plan score")?;

        if updated == 0 {
            return Err(CohortError::PlanNotFound {
                workorder_id: workorder_id.to_string(),
            });
        }
        Ok(())
    }

    /// Retrieves a plan by work-order id.
    pub fn get_plan(&self, workorder_id: &str) -> Result<Option<StoredPlan>> {
        self.connection
            .query_row(SELECT_PLAN_SQL, params![workorder_id], Self::build_plan_from_row)
            .optional()
            .db_context("Failed to query plan")
    }

    /// Lists every stored plan, newest first.
    pub fn list_plans(&self) -> Result<Vec<StoredPlan>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_ALL_PLANS_SQL)
            .db_context("Failed to prepare query")?;

        let plans = stmt
            .query_map([], Self::build_plan_from_row)
            .db_context("Failed to query plans")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to collect plans")?;

        Ok(plans)
    }

    /// Makes a plan immutable. Locking twice is a no-op.
    pub fn lock_plan(&mut self, workorder_id: &str) -> Result<()> {
        let updated = self
            .connection
            .execute(LOCK_PLAN_SQL, params![Timestamp::now().to_string(), workorder_id])
            .db_context("Failed to lock plan")?;

        if updated == 0 {
            return Err(CohortError::PlanNotFound {
                workorder_id: workorder_id.to_string(),
            });
        }
        Ok(())
    }
}
