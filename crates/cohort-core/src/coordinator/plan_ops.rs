//! Plan operations for the Coordinator.

use log::info;
use serde::Serialize;

use super::Coordinator;
use crate::{
    error::{CohortError, Result},
    models::{PlanRecord, StoredPlan},
    params::ValidatePlan,
    validator::{rules, MechanicalFixer, RefinementOutcome, ValidationReport},
};

/// A stored plan and the report it was stored with.
#[derive(Debug, Clone, Serialize)]
pub struct PlanImport {
    pub plan: StoredPlan,
    pub report: ValidationReport,
}

impl Coordinator {
    /// Scores a JSON plan document without storing anything.
    pub fn validate_source(&self, source: &str) -> ValidationReport {
        self.validator.validate_source(source)
    }

    /// Scores and stores a JSON plan document.
    ///
    /// Plans are stored whatever their score; only a passing plan can later
    /// back a session.
    ///
    /// # Errors
    ///
    /// * [`CohortError::InvalidInput`] if the document cannot be parsed
    /// * [`CohortError::SchemaViolation`] if the work-order id is malformed
    /// * [`CohortError::PlanLocked`] if a session already executes the plan
    pub async fn import_plan(&self, source: &str) -> Result<PlanImport> {
        let report = self.validator.validate_source(source);
        if let Some(issue) = report
            .issues
            .iter()
            .find(|issue| issue.code == rules::MALFORMED_DOCUMENT)
        {
            return Err(CohortError::invalid_input("document").with_reason(issue.message.clone()));
        }
        let plan: PlanRecord = serde_json::from_str(source)?;

        let stored_report = report.clone();
        let stored = self
            .with_db(move |db| db.save_plan(&plan, &stored_report))
            .await?;
        info!(
            "Imported plan {} with score {} ({})",
            stored.workorder_id,
            report.score,
            report.decision.as_str()
        );

        Ok(PlanImport {
            plan: stored,
            report,
        })
    }

    /// Retrieves a stored plan.
    pub async fn get_plan(&self, workorder_id: &str) -> Result<StoredPlan> {
        let id = workorder_id.to_string();
        self.with_db(move |db| db.get_plan(&id))
            .await?
            .ok_or_else(|| CohortError::PlanNotFound {
                workorder_id: workorder_id.to_string(),
            })
    }

    /// Lists every stored plan.
    pub async fn list_plans(&self) -> Result<Vec<StoredPlan>> {
        self.with_db(|db| db.list_plans()).await
    }

    /// Re-scores a stored plan and records the result.
    pub async fn validate_plan(&self, workorder_id: &str) -> Result<ValidationReport> {
        let stored = self.get_plan(workorder_id).await?;
        let report = self.validator.validate(&stored.plan);

        let id = workorder_id.to_string();
        let recorded = report.clone();
        self.with_db(move |db| db.record_plan_score(&id, &recorded))
            .await?;

        Ok(report)
    }

    /// Scores either a stored plan or a raw document.
    pub async fn validate(&self, params: &ValidatePlan) -> Result<ValidationReport> {
        match (&params.workorder_id, &params.document) {
            (Some(workorder_id), None) => self.validate_plan(workorder_id).await,
            (None, Some(document)) => Ok(self.validate_source(document)),
            _ => Err(CohortError::invalid_input("workorder_id")
                .with_reason("provide exactly one of workorder_id or document")),
        }
    }

    /// Runs the mechanical refinement loop on a stored plan and stores the
    /// best result.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::PlanLocked`] once a session executes the plan.
    pub async fn refine_plan(&self, workorder_id: &str) -> Result<RefinementOutcome> {
        let stored = self.get_plan(workorder_id).await?;
        if stored.locked {
            return Err(CohortError::PlanLocked {
                workorder_id: workorder_id.to_string(),
            });
        }

        let outcome = self.validator.refine(stored.plan, &mut MechanicalFixer);
        let plan = outcome.plan.clone();
        let report = outcome.final_report().clone();
        let id = workorder_id.to_string();

        if outcome.iterations() > 0 {
            self.with_db(move |db| db.save_plan(&plan, &report).map(|_| ()))
                .await?;
            info!(
                "Refined plan {workorder_id} in {} iteration(s) to score {}",
                outcome.iterations(),
                outcome.final_report().score
            );
        } else {
            self.with_db(move |db| db.record_plan_score(&id, &report))
                .await?;
        }

        Ok(outcome)
    }
}
