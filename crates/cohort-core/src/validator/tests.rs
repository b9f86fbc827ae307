//! Tests for the plan validator.

use super::*;
use crate::{
    fixtures::{passing_plan, section_body, task},
    validator::rules,
};

/// Leaves a task with neither an acceptance criterion nor a description.
fn clear_criterion(task: &mut crate::models::PlanTask) {
    task.acceptance_criteria = None;
    task.description.clear();
}

#[test]
fn test_passing_plan_scores_full_marks() {
    let report = PlanValidator::default().validate(&passing_plan());

    assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
    assert_eq!(report.score, 100);
    assert_eq!(report.decision, GateDecision::Pass);
    assert_eq!(report.workorder_id.as_deref(), Some("WO-AUTH-001"));
}

#[test]
fn test_placeholder_costs_exactly_one_major_issue() {
    let mut plan = passing_plan();
    let body = plan.sections.get_mut("risk_assessment").unwrap();
    body.push_str(" TODO: fill in");

    let report = PlanValidator::default().validate(&plan);

    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].severity, Severity::Major);
    assert_eq!(report.issues[0].code, rules::PLACEHOLDER_TEXT);
    assert_eq!(report.issues[0].location, "sections.risk_assessment");
    assert_eq!(report.score, 95);
    assert_eq!(report.decision, GateDecision::Pass);
}

#[test]
fn test_description_serves_as_completion_criterion() {
    let mut plan = passing_plan();
    for task in &mut plan.tasks {
        task.acceptance_criteria = None;
    }

    let report = PlanValidator::default().validate(&plan);

    assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
    assert_eq!(report.score, 100);
    assert_eq!(report.decision, GateDecision::Pass);
}

#[test]
fn test_task_without_any_criterion_is_major() {
    let mut plan = passing_plan();
    clear_criterion(&mut plan.tasks[2]);

    let report = PlanValidator::default().validate(&plan);

    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].code, rules::MISSING_ACCEPTANCE);
    assert_eq!(report.issues[0].location, "tasks[AUTH-003]");
    assert_eq!(report.score, 95);
}

#[test]
fn test_validation_is_deterministic() {
    let mut plan = passing_plan();
    plan.sections.shift_remove("architecture");
    clear_criterion(&mut plan.tasks[0]);
    plan.tasks.push(task("setupDb", "build", &["missing"]));

    let validator = PlanValidator::default();
    let first = validator.validate(&plan);
    let second = validator.validate(&plan);

    assert_eq!(first, second);
}

#[test]
fn test_cycle_is_critical_and_never_passes() {
    let mut plan = passing_plan();
    plan.tasks[0].dependencies = vec!["AUTH-002".to_string()];

    let report = PlanValidator::default().validate(&plan);

    assert_eq!(report.count(Severity::Critical), 1);
    assert_eq!(report.issues[0].code, rules::DEPENDENCY_CYCLE);
    assert!(report.issues[0].message.contains("AUTH-001 -> AUTH-002 -> AUTH-001"));
    assert_eq!(report.score, 90);
    assert_ne!(report.decision, GateDecision::Pass);
}

#[test]
fn test_removing_a_critical_issue_never_lowers_the_score() {
    let validator = PlanValidator::default();
    let mut plan = passing_plan();
    plan.sections.shift_remove("context");
    plan.tasks[2].dependencies.push("AUTH-999".to_string());
    let before = validator.validate(&plan);

    plan.sections
        .insert("context".to_string(), section_body("context"));
    let after = validator.validate(&plan);

    assert!(after.score >= before.score);
    assert_eq!(after.count(Severity::Critical), before.count(Severity::Critical) - 1);
}

#[test]
fn test_critical_rules() {
    let mut plan = passing_plan();
    plan.workorder_id = "auth-1".to_string();
    plan.sections.shift_remove("testing_strategy");
    plan.tasks.push(task("AUTH-005", "build", &[]));
    plan.tasks[1].dependencies.push("AUTH-002".to_string());

    let report = PlanValidator::default().validate(&plan);
    let codes: Vec<&str> = report
        .issues
        .iter()
        .filter(|issue| issue.severity == Severity::Critical)
        .map(|issue| issue.code.as_str())
        .collect();

    assert!(codes.contains(&rules::INVALID_WORKORDER_ID));
    assert!(codes.contains(&rules::MISSING_SECTION));
    assert!(codes.contains(&rules::DUPLICATE_TASK_ID));
    assert!(codes.contains(&rules::SELF_DEPENDENCY));
    assert_eq!(report.score, 60);
    assert_eq!(report.decision, GateDecision::ManualRevision);
}

#[test]
fn test_major_rules() {
    let mut plan = passing_plan();
    plan.phases.push("release".to_string());
    plan.tasks[4].acceptance_criteria = Some("   ".to_string());
    plan.tasks[3].phase = "qa".to_string();

    let report = PlanValidator::default().validate(&plan);
    let codes: Vec<&str> = report.issues.iter().map(|issue| issue.code.as_str()).collect();

    assert!(codes.contains(&rules::EMPTY_PHASE));
    assert!(codes.contains(&rules::MISSING_ACCEPTANCE));
    assert!(codes.contains(&rules::UNDECLARED_PHASE));
    assert_eq!(report.count(Severity::Major), 3);
    assert_eq!(report.score, 85);
    assert_eq!(report.decision, GateDecision::NeedsRefinement);
}

#[test]
fn test_minor_rules() {
    let mut plan = passing_plan();
    plan.sections
        .insert("context".to_string(), "Too short.".to_string());
    plan.sections.insert(
        "Rollout Notes".to_string(),
        section_body("rollout notes"),
    );
    plan.tasks.push(task("cleanup", "build", &["AUTH-005"]));

    let report = PlanValidator::default().validate(&plan);

    assert_eq!(report.count(Severity::Minor), 3, "{:?}", report.issues);
    assert_eq!(report.score, 97);
}

#[test]
fn test_empty_task_list() {
    let mut plan = passing_plan();
    plan.tasks.clear();
    plan.phases.clear();

    let report = PlanValidator::default().validate(&plan);

    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].code, rules::NO_TASKS);
}

#[test]
fn test_malformed_documents_yield_one_critical_issue() {
    let validator = PlanValidator::default();

    for source in [
        "not json at all",
        "[1, 2, 3]",
        r#"{"workorder_id": "WO-AUTH-001", "sections": {}}"#,
        r#"{"workorder_id": "WO-AUTH-001", "sections": {}, "tasks": [{"id": 7}]}"#,
    ] {
        let report = validator.validate_source(source);
        assert_eq!(report.issues.len(), 1, "{source}");
        assert_eq!(report.issues[0].severity, Severity::Critical);
        assert_eq!(report.issues[0].code, rules::MALFORMED_DOCUMENT);
        assert_eq!(report.score, 90);
        assert_eq!(report.decision, GateDecision::ManualRevision);
    }
}

#[test]
fn test_validate_source_matches_validate() {
    let plan = passing_plan();
    let source = serde_json::to_string(&plan).unwrap();
    let validator = PlanValidator::default();

    assert_eq!(validator.validate_source(&source), validator.validate(&plan));
}

#[test]
fn test_score_floors_at_zero() {
    let mut plan = passing_plan();
    plan.sections.clear();
    plan.workorder_id.clear();

    let report = PlanValidator::default().validate(&plan);

    assert_eq!(report.score, 0);
    assert_eq!(report.decision, GateDecision::ManualRevision);
}

#[test]
fn test_decide_thresholds() {
    let validator = PlanValidator::default();
    assert_eq!(validator.decide(100, 0), GateDecision::Pass);
    assert_eq!(validator.decide(90, 0), GateDecision::Pass);
    assert_eq!(validator.decide(90, 1), GateDecision::NeedsRefinement);
    assert_eq!(validator.decide(89, 0), GateDecision::NeedsRefinement);
    assert_eq!(validator.decide(70, 0), GateDecision::NeedsRefinement);
    assert_eq!(validator.decide(69, 0), GateDecision::ManualRevision);
}

#[test]
fn test_mechanical_refinement_reaches_pass() {
    let mut plan = passing_plan();
    plan.tasks[0].dependencies = vec!["AUTH-001".to_string(), "GONE-1".to_string()];
    plan.phases.push("release".to_string());
    let validator = PlanValidator::default();
    assert_eq!(validator.validate(&plan).decision, GateDecision::NeedsRefinement);

    let outcome = validator.refine(plan, &mut MechanicalFixer);

    assert_eq!(outcome.iterations(), 1);
    assert_eq!(outcome.final_report().decision, GateDecision::Pass);
    assert!(outcome.plan.tasks[0].dependencies.is_empty());
    assert_eq!(outcome.plan.phases, vec!["design", "build"]);
}

#[test]
fn test_refinement_keeps_colliding_sections() {
    let mut plan = passing_plan();
    plan.sections.insert(
        "Risk Assessment".to_string(),
        section_body("risk assessment notes"),
    );
    plan.tasks[1].dependencies.push("GONE-1".to_string());
    let before = plan.sections.len();

    let outcome = PlanValidator::default().refine(plan, &mut MechanicalFixer);

    assert_eq!(outcome.iterations(), 1);
    assert_eq!(outcome.plan.sections.len(), before);
    assert!(outcome.plan.sections.contains_key("Risk Assessment"));
    assert!(outcome.plan.sections.contains_key("risk_assessment"));
}

#[test]
fn test_refinement_is_capped() {
    struct Stubborn(usize);

    impl PlanFixer for Stubborn {
        fn fix(&mut self, plan: &PlanRecord, _report: &ValidationReport) -> Option<PlanRecord> {
            self.0 += 1;
            let mut next = plan.clone();
            next.title = format!("attempt {}", self.0);
            Some(next)
        }
    }

    let mut plan = passing_plan();
    for task in &mut plan.tasks[..3] {
        clear_criterion(task);
    }
    let mut fixer = Stubborn(0);

    let outcome = PlanValidator::default().refine(plan, &mut fixer);

    assert_eq!(fixer.0, 3);
    assert_eq!(outcome.iterations(), 3);
    assert_eq!(outcome.final_report().score, 85);
}

#[test]
fn test_refinement_refuses_to_cross_the_floor() {
    struct Destructive;

    impl PlanFixer for Destructive {
        fn fix(&mut self, plan: &PlanRecord, _report: &ValidationReport) -> Option<PlanRecord> {
            let mut next = plan.clone();
            next.sections.clear();
            Some(next)
        }
    }

    let mut plan = passing_plan();
    for task in &mut plan.tasks[..3] {
        clear_criterion(task);
    }
    let original = plan.clone();

    let outcome = PlanValidator::default().refine(plan, &mut Destructive);

    assert_eq!(outcome.iterations(), 0);
    assert_eq!(outcome.plan, original);
}

#[test]
fn test_refinement_skips_passing_and_manual_plans() {
    let validator = PlanValidator::default();
    let outcome = validator.refine(passing_plan(), &mut MechanicalFixer);
    assert_eq!(outcome.iterations(), 0);

    let mut broken = passing_plan();
    broken.sections.clear();
    let outcome = validator.refine(broken, &mut MechanicalFixer);
    assert_eq!(outcome.iterations(), 0);
    assert_eq!(outcome.final_report().decision, GateDecision::ManualRevision);
}
