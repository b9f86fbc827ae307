//! Plan record model definition and related functionality.

use indexmap::IndexMap;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::WorkorderId;
use crate::validator::GateDecision;

/// Section names every plan must carry, in canonical order.
pub const CANONICAL_SECTIONS: [&str; 10] = [
    "executive_summary",
    "context",
    "current_state",
    "key_features",
    "architecture",
    "risk_assessment",
    "phased_task_breakdown",
    "testing_strategy",
    "success_criteria",
    "implementation_checklist",
];

/// Section holding the criteria that synthesis scores the session against.
pub const SUCCESS_CRITERIA_SECTION: &str = "success_criteria";

/// A structured implementation plan for one unit of work.
///
/// `workorder_id` is kept as raw text so that a malformed or missing id can be
/// reported by the validator instead of failing deserialisation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanRecord {
    /// Work-order identifier, `WO-<SLUG>-<NNN>`
    #[serde(default)]
    pub workorder_id: String,

    /// Human-readable title
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Ordered section-name → section-body mapping
    pub sections: IndexMap<String, String>,

    /// Declared phases in execution order; derived from tasks when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<String>,

    /// Discrete units of work
    pub tasks: Vec<PlanTask>,
}

/// A plan as held by the record store, with its latest gate result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredPlan {
    pub workorder_id: WorkorderId,
    pub plan: PlanRecord,
    /// Score from the most recent validation
    pub last_score: Option<u8>,
    /// Gate decision from the most recent validation
    pub last_decision: Option<GateDecision>,
    /// Set once a session starts executing the plan
    pub locked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StoredPlan {
    /// Whether the stored validation result clears the gate.
    pub fn passed(&self) -> bool {
        self.last_decision == Some(GateDecision::Pass)
    }
}

/// One task in a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanTask {
    /// Identifier, unique within the plan
    pub id: String,

    /// What has to be done
    pub description: String,

    /// Phase the task belongs to
    pub phase: String,

    /// Ids of tasks that must finish first
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Measurable completion criterion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
}

impl PlanTask {
    /// The task's completion criterion: the explicit acceptance criterion
    /// when one is given, otherwise the description. `None` when blank.
    pub fn completion_criterion(&self) -> Option<&str> {
        let text = self
            .acceptance_criteria
            .as_deref()
            .unwrap_or(&self.description)
            .trim();
        (!text.is_empty()).then_some(text)
    }
}

impl PlanRecord {
    /// Phases in execution order.
    ///
    /// Declared phases win; otherwise phases appear in the order their first
    /// task does.
    pub fn phase_order(&self) -> Vec<String> {
        if !self.phases.is_empty() {
            return self.phases.clone();
        }
        let mut order: Vec<String> = Vec::new();
        for task in &self.tasks {
            if !order.contains(&task.phase) {
                order.push(task.phase.clone());
            }
        }
        order
    }

    /// Tasks assigned to `phase`, in plan order.
    pub fn tasks_in_phase<'a>(&'a self, phase: &'a str) -> impl Iterator<Item = &'a PlanTask> {
        self.tasks.iter().filter(move |task| task.phase == phase)
    }

    /// Looks up a task by id.
    pub fn task(&self, id: &str) -> Option<&PlanTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Body of a section, if present.
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }

    /// Success criteria listed as bullet or numbered lines in the
    /// `success_criteria` section.
    pub fn success_criteria(&self) -> Vec<String> {
        self.section(SUCCESS_CRITERIA_SECTION)
            .map(|body| {
                body.lines()
                    .filter_map(|line| {
                        let line = line.trim();
                        let item = line
                            .strip_prefix("- [ ]")
                            .or_else(|| line.strip_prefix("- [x]"))
                            .or_else(|| line.strip_prefix("- "))
                            .or_else(|| line.strip_prefix("* "))
                            .or_else(|| strip_ordinal(line))?;
                        let item = item.trim();
                        (!item.is_empty()).then(|| item.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Strips a leading `1.` / `12)` style ordinal.
fn strip_ordinal(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))
}
