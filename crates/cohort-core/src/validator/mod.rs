//! Plan quality gate.
//!
//! [`PlanValidator`] scores a [`PlanRecord`] from 0 to 100 and lists every
//! issue it found. The score starts at 100 and loses a fixed number of points
//! per issue:
//!
//! | Severity | Points | Examples                                              |
//! |----------|--------|-------------------------------------------------------|
//! | critical | 10     | missing section, task cycle, duplicate id, bad WO id  |
//! | major    | 5      | placeholder text, task without criterion, empty phase |
//! | minor    | 1      | short section body, inconsistent naming               |
//!
//! Validation is a pure function of the plan and the [`ValidatorConfig`]:
//! the same input always yields the same score and the same ordered issue
//! list. Malformed input never panics or errors; it is reported as a single
//! critical issue so callers always get a score.
//!
//! # Examples
//!
//! ```rust
//! use cohort_core::validator::{GateDecision, PlanValidator};
//!
//! let validator = PlanValidator::default();
//! let report = validator.validate_source("{ \"title\": \"no sections\" }");
//! assert_eq!(report.issues.len(), 1);
//! assert_eq!(report.decision, GateDecision::ManualRevision);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{config::ValidatorConfig, error::CohortError, models::PlanRecord};

pub mod graph;
pub mod refine;
pub mod rules;

pub use refine::{MechanicalFixer, PlanFixer, RefinementOutcome};

/// Top-level keys a plan document must carry.
pub const REQUIRED_KEYS: [&str; 2] = ["sections", "tasks"];

/// How much an issue costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    /// Points deducted per issue of this severity.
    pub fn penalty(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::Major => 5,
            Severity::Minor => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

/// A single problem found in a plan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    /// Where in the plan the problem is, e.g. `sections.risk_assessment`
    pub location: String,
    /// Stable rule identifier, e.g. `dependency-cycle`
    pub code: String,
    pub message: String,
}

impl Issue {
    pub fn new(
        severity: Severity,
        code: &str,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            location: location.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// What a caller should do with a scored plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Score clears the pass threshold and nothing critical remains
    Pass,
    /// Eligible for the bounded auto-fix loop
    NeedsRefinement,
    /// Below the refinement floor; a human has to revise the plan
    ManualRevision,
}

impl GateDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Pass => "pass",
            GateDecision::NeedsRefinement => "needs_refinement",
            GateDecision::ManualRevision => "manual_revision",
        }
    }
}

impl FromStr for GateDecision {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(GateDecision::Pass),
            "needs_refinement" => Ok(GateDecision::NeedsRefinement),
            "manual_revision" => Ok(GateDecision::ManualRevision),
            other => Err(CohortError::invalid_input("decision")
                .with_reason(format!("unknown gate decision '{other}'"))),
        }
    }
}

/// Result of validating one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Work-order id as found in the document, if any
    pub workorder_id: Option<String>,
    pub score: u8,
    pub decision: GateDecision,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// Number of issues with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    pub fn passed(&self) -> bool {
        self.decision == GateDecision::Pass
    }
}

/// Scores plan records against completeness, consistency and specificity
/// rules.
#[derive(Debug, Clone, Default)]
pub struct PlanValidator {
    config: ValidatorConfig,
}

impl PlanValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Scores a parsed plan.
    pub fn validate(&self, plan: &PlanRecord) -> ValidationReport {
        let mut issues = Vec::new();
        rules::check_workorder(plan, &mut issues);
        rules::check_sections(plan, &self.config, &mut issues);
        rules::check_tasks(plan, &mut issues);
        rules::check_phases(plan, &mut issues);
        rules::check_dependencies(plan, &mut issues);
        rules::check_naming(plan, &mut issues);

        let workorder_id = (!plan.workorder_id.is_empty()).then(|| plan.workorder_id.clone());
        self.report(workorder_id, issues)
    }

    /// Scores a JSON document, reporting structural problems as one critical
    /// issue.
    pub fn validate_value(&self, value: &serde_json::Value) -> ValidationReport {
        let workorder_id = value
            .get("workorder_id")
            .and_then(serde_json::Value::as_str)
            .map(String::from);

        let Some(object) = value.as_object() else {
            return self.malformed(workorder_id, "plan document must be a JSON object".into());
        };

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return self.malformed(
                workorder_id,
                format!("missing required top-level key(s): {}", missing.join(", ")),
            );
        }

        match serde_json::from_value::<PlanRecord>(value.clone()) {
            Ok(plan) => self.validate(&plan),
            Err(e) => self.malformed(workorder_id, format!("plan document does not match schema: {e}")),
        }
    }

    /// Parses and scores a JSON plan document.
    pub fn validate_source(&self, source: &str) -> ValidationReport {
        match serde_json::from_str::<serde_json::Value>(source) {
            Ok(value) => self.validate_value(&value),
            Err(e) => self.malformed(None, format!("plan document is not valid JSON: {e}")),
        }
    }

    /// Maps a score and its critical issue count onto the gate thresholds.
    pub fn decide(&self, score: u8, critical: usize) -> GateDecision {
        if score < self.config.refine_floor {
            GateDecision::ManualRevision
        } else if score >= self.config.pass_score && critical == 0 {
            GateDecision::Pass
        } else {
            GateDecision::NeedsRefinement
        }
    }

    fn malformed(&self, workorder_id: Option<String>, message: String) -> ValidationReport {
        let issue = Issue::new(Severity::Critical, rules::MALFORMED_DOCUMENT, "document", message);
        let mut report = self.report(workorder_id, vec![issue]);
        // An unparsable document cannot be refined mechanically.
        report.decision = GateDecision::ManualRevision;
        report
    }

    fn report(&self, workorder_id: Option<String>, mut issues: Vec<Issue>) -> ValidationReport {
        issues.sort();
        issues.dedup();

        let penalty: u32 = issues.iter().map(|issue| issue.severity.penalty()).sum();
        let score = 100u32.saturating_sub(penalty) as u8;
        let critical = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Critical)
            .count();

        ValidationReport {
            workorder_id,
            score,
            decision: self.decide(score, critical),
            issues,
        }
    }
}

#[cfg(test)]
mod tests;
