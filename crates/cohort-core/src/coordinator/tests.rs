//! Tests for the coordinator module.

use tempfile::TempDir;

use super::*;
use crate::{
    fixtures::passing_plan,
    gate::BlockerReason,
    guard::ConflictKind,
    models::{SessionStatus, TaskStatus},
    params::{ArchiveSession, AssignAgent, CheckGate, CreateSession, ExportSession, SetTaskStatus},
    validator::GateDecision,
};

/// Helper function to create a test coordinator
async fn create_test_coordinator() -> (TempDir, Coordinator) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let coordinator = CoordinatorBuilder::new()
        .with_database_path(Some(&db_path))
        .build()
        .await
        .expect("Failed to create coordinator");
    (temp_dir, coordinator)
}

async fn import_passing_plan(coordinator: &Coordinator) {
    let source = serde_json::to_string(&passing_plan()).unwrap();
    let imported = coordinator.import_plan(&source).await.expect("Failed to import plan");
    assert_eq!(imported.report.decision, GateDecision::Pass);
}

fn assign(agent: &str, phase: &str, claimed: &[&str]) -> AssignAgent {
    AssignAgent {
        session_id: "sess-1".to_string(),
        agent_id: agent.to_string(),
        phase: phase.to_string(),
        tasks: Vec::new(),
        forbidden_paths: Vec::new(),
        claimed_paths: claimed.iter().map(|p| p.to_string()).collect(),
    }
}

async fn running_session(coordinator: &Coordinator) -> (AgentAssignment, AgentAssignment) {
    import_passing_plan(coordinator).await;
    coordinator
        .create_session(&CreateSession {
            workorder_id: "WO-AUTH-001".to_string(),
            session_id: Some("sess-1".to_string()),
        })
        .await
        .expect("Failed to create session");

    let a = coordinator
        .assign_agent(&assign("A", "design", &["docs/design"]))
        .await
        .expect("Failed to assign A");
    let b = coordinator
        .assign_agent(&assign("B", "build", &["src/auth"]))
        .await
        .expect("Failed to assign B");

    let report = coordinator.audit_conflicts("sess-1").await.unwrap();
    assert!(report.is_clean());
    coordinator.start("sess-1").await.expect("Failed to start");
    (a, b)
}

fn set(agent: &AgentAssignment, task: &str, status: &str) -> SetTaskStatus {
    SetTaskStatus {
        session_id: "sess-1".to_string(),
        agent_id: agent.record.agent_id.clone(),
        token: agent.token.to_string(),
        task_id: task.to_string(),
        status: status.to_string(),
        note: None,
    }
}

#[tokio::test]
async fn test_session_requires_passing_plan() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    let mut plan = passing_plan();
    plan.tasks[0].dependencies = vec!["AUTH-002".to_string()];
    coordinator
        .import_plan(&serde_json::to_string(&plan).unwrap())
        .await
        .unwrap();

    let err = coordinator
        .create_session(&CreateSession {
            workorder_id: "WO-AUTH-001".to_string(),
            session_id: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CohortError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_assignment_defaults_to_phase_tasks() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    let (a, b) = running_session(&coordinator).await;

    let ids = |assignment: &AgentAssignment| -> Vec<String> {
        assignment.record.tasks.iter().map(|t| t.id.clone()).collect()
    };
    assert_eq!(ids(&a), vec!["AUTH-001", "AUTH-002"]);
    assert_eq!(ids(&b), vec!["AUTH-003", "AUTH-004", "AUTH-005"]);
}

#[tokio::test]
async fn test_start_requires_clean_audit() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    import_passing_plan(&coordinator).await;
    coordinator
        .create_session(&CreateSession {
            workorder_id: "WO-AUTH-001".to_string(),
            session_id: Some("sess-1".to_string()),
        })
        .await
        .unwrap();
    coordinator
        .assign_agent(&assign("A", "design", &["src/**"]))
        .await
        .unwrap();
    coordinator
        .assign_agent(&assign("B", "build", &["src/auth/mod.rs"]))
        .await
        .unwrap();

    let err = coordinator.start("sess-1").await.unwrap_err();
    assert!(matches!(err, CohortError::SessionState { .. }));

    let report = coordinator.audit_conflicts("sess-1").await.unwrap();
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].kind, ConflictKind::SharedClaim);
    let session = coordinator.get_session("sess-1").await.unwrap();
    assert_eq!(session.status, SessionStatus::Planning);
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    let (a, b) = running_session(&coordinator).await;

    let mut params = set(&a, "AUTH-001", "in_progress");
    params.token = b.token.to_string();
    let err = coordinator.set_task_status(&params).await.unwrap_err();

    assert!(matches!(err, CohortError::OwnershipViolation { .. }));
}

#[tokio::test]
async fn test_later_phase_waits_for_gate() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    let (_a, b) = running_session(&coordinator).await;

    let err = coordinator
        .set_task_status(&set(&b, "AUTH-003", "in_progress"))
        .await
        .unwrap_err();
    assert!(matches!(err, CohortError::SessionState { .. }));

    coordinator
        .set_task_status(&set(&b, "AUTH-003", "blocked"))
        .await
        .expect("blocked is always reportable");
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let (temp_dir, coordinator) = create_test_coordinator().await;
    let (a, b) = running_session(&coordinator).await;

    coordinator
        .set_task_status(&set(&a, "AUTH-001", "done"))
        .await
        .unwrap();
    let gate = coordinator
        .check_gate(&CheckGate {
            session_id: "sess-1".to_string(),
            phase: None,
        })
        .await
        .unwrap();
    assert!(!gate.advance);
    assert_eq!(gate.blockers.len(), 1);
    assert_eq!(
        gate.blockers[0].reason,
        BlockerReason::Incomplete(TaskStatus::NotStarted)
    );
    let err = coordinator.advance_phase("sess-1").await.unwrap_err();
    assert!(err.to_string().contains("A / AUTH-002"));
    match err {
        CohortError::GateClosed { phase, blockers } => {
            assert_eq!(phase, "design");
            assert_eq!(blockers, gate.blockers);
        }
        other => panic!("unexpected error: {other}"),
    }

    coordinator
        .set_task_status(&set(&a, "AUTH-002", "complete"))
        .await
        .unwrap();
    let advance = coordinator.advance_phase("sess-1").await.unwrap();
    assert_eq!(advance.completed_phase, "design");
    assert_eq!(advance.authorized_phase.as_deref(), Some("build"));

    for task in ["AUTH-003", "AUTH-004", "AUTH-005"] {
        coordinator
            .set_task_status(&set(&b, task, "complete"))
            .await
            .unwrap();
    }
    coordinator
        .record_output(&crate::params::RecordOutput {
            session_id: "sess-1".to_string(),
            agent_id: "B".to_string(),
            token: b.token.to_string(),
            output: "Token rotation verified in staging".to_string(),
        })
        .await
        .unwrap();

    let advance = coordinator.advance_phase("sess-1").await.unwrap();
    assert_eq!(advance.status, SessionStatus::Complete);
    assert_eq!(advance.authorized_phase, None);

    let report = coordinator.synthesize("sess-1").await.unwrap();
    assert_eq!(report.completion_ratio, 1.0);
    assert_eq!(report.criteria_passed(), 2);
    assert_eq!(coordinator.synthesize("sess-1").await.unwrap(), report);

    let exported = coordinator
        .export(&ExportSession {
            session_id: "sess-1".to_string(),
            directory: temp_dir.path().join("out").display().to_string(),
        })
        .await
        .unwrap();
    assert!(exported.join("report.json").is_file());

    let archived = coordinator
        .archive(&ArchiveSession {
            session_id: "sess-1".to_string(),
            directory: Some(temp_dir.path().join("out").display().to_string()),
        })
        .await
        .unwrap();
    let export_dir = archived.export_dir.unwrap();
    assert!(export_dir.ends_with("archive/sess-1"));
    assert!(export_dir.join("agents/B.json").is_file());

    assert!(coordinator.list_sessions(false).await.unwrap().is_empty());
    assert_eq!(coordinator.list_sessions(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_plan_is_locked_once_running() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    running_session(&coordinator).await;

    let source = serde_json::to_string(&passing_plan()).unwrap();
    let err = coordinator.import_plan(&source).await.unwrap_err();
    assert!(matches!(err, CohortError::PlanLocked { .. }));

    let err = coordinator.refine_plan("WO-AUTH-001").await.unwrap_err();
    assert!(matches!(err, CohortError::PlanLocked { .. }));
}

#[tokio::test]
async fn test_refine_plan_stores_improved_plan() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    let mut plan = passing_plan();
    plan.tasks[1].dependencies.push("GONE-1".to_string());
    coordinator
        .import_plan(&serde_json::to_string(&plan).unwrap())
        .await
        .unwrap();

    let outcome = coordinator.refine_plan("WO-AUTH-001").await.unwrap();
    assert_eq!(outcome.final_report().decision, GateDecision::Pass);

    let stored = coordinator.get_plan("WO-AUTH-001").await.unwrap();
    assert!(stored.passed());
    assert_eq!(stored.plan.tasks[1].dependencies, vec!["AUTH-001"]);
}

#[tokio::test]
async fn test_import_rejects_malformed_document() {
    let (_temp_dir, coordinator) = create_test_coordinator().await;
    let err = coordinator.import_plan("{ not json").await.unwrap_err();
    assert!(matches!(err, CohortError::InvalidInput { .. }));
}
