//! Shared test fixtures.

use indexmap::IndexMap;

use crate::models::{PlanRecord, PlanTask, CANONICAL_SECTIONS};

/// Body long enough to clear the default minimum section length.
pub(crate) fn section_body(name: &str) -> String {
    format!("The {name} section describes the authentication rework in concrete terms.")
}

pub(crate) fn task(id: &str, phase: &str, deps: &[&str]) -> PlanTask {
    PlanTask {
        id: id.to_string(),
        description: format!("Implement {id}"),
        phase: phase.to_string(),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        acceptance_criteria: Some(format!("{id} tests pass in CI")),
    }
}

/// Ten filled canonical sections, five acyclic tasks over two phases and a
/// valid work-order id. Scores 100 with no issues.
pub(crate) fn passing_plan() -> PlanRecord {
    let mut sections: IndexMap<String, String> = CANONICAL_SECTIONS
        .iter()
        .map(|name| (name.to_string(), section_body(name)))
        .collect();
    sections.insert(
        "success_criteria".to_string(),
        "- AUTH-001 and AUTH-002 are complete\n- token rotation verified in staging\n".to_string(),
    );

    PlanRecord {
        workorder_id: "WO-AUTH-001".to_string(),
        title: "Authentication rework".to_string(),
        sections,
        phases: vec!["design".to_string(), "build".to_string()],
        tasks: vec![
            task("AUTH-001", "design", &[]),
            task("AUTH-002", "design", &["AUTH-001"]),
            task("AUTH-003", "build", &["AUTH-002"]),
            task("AUTH-004", "build", &["AUTH-002"]),
            task("AUTH-005", "build", &["AUTH-003", "AUTH-004"]),
        ],
    }
}
