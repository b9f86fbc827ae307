mod common;

use cohort_core::{
    models::{HistoryEntry, OwnerToken, PlanRecord, SessionRecord, StatusRecord, WorkorderId},
    CohortError, Database, PlanValidator, SessionStatus, TaskStatus, ValidatorConfig,
};
use common::AUTH_PLAN;
use jiff::Timestamp;
use tempfile::NamedTempFile;

/// Helper function to create a temporary database for testing
fn create_test_db() -> (NamedTempFile, Database) {
    let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
    let db = Database::new(temp_file.path()).expect("Failed to create test database");
    (temp_file, db)
}

fn auth_plan() -> PlanRecord {
    serde_json::from_str(AUTH_PLAN).expect("fixture plan parses")
}

fn workorder() -> WorkorderId {
    "WO-AUTH-001".parse().unwrap()
}

fn store_plan(db: &mut Database) {
    let plan = auth_plan();
    let report = PlanValidator::new(ValidatorConfig::default()).validate(&plan);
    db.save_plan(&plan, &report).expect("Failed to save plan");
}

fn store_session(db: &mut Database, session_id: &str) -> SessionRecord {
    let session = SessionRecord::new(
        session_id,
        workorder(),
        vec!["design".to_string(), "build".to_string()],
    );
    db.create_session(&session).expect("Failed to create session");
    session
}

fn agent_record(agent_id: &str) -> StatusRecord {
    StatusRecord::new(
        "sess-1",
        agent_id,
        workorder(),
        "design",
        vec!["AUTH-001".to_string(), "AUTH-002".to_string()],
    )
}

#[test]
fn test_plan_round_trip_keeps_score() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);

    let stored = db
        .get_plan("WO-AUTH-001")
        .expect("Failed to get plan")
        .expect("Plan should exist");

    assert_eq!(stored.plan, auth_plan());
    assert_eq!(stored.last_score, Some(100));
    assert!(stored.passed());
    assert!(!stored.locked);
    assert_eq!(db.list_plans().unwrap().len(), 1);
    assert!(db.get_plan("WO-NONE-001").unwrap().is_none());
}

#[test]
fn test_locked_plan_rejects_writes() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    db.lock_plan("WO-AUTH-001").unwrap();

    let plan = auth_plan();
    let report = PlanValidator::new(ValidatorConfig::default()).validate(&plan);
    let err = db.save_plan(&plan, &report).unwrap_err();

    assert!(matches!(err, CohortError::PlanLocked { .. }));
}

#[test]
fn test_session_requires_stored_plan() {
    let (_temp_file, mut db) = create_test_db();
    let session = SessionRecord::new("sess-1", workorder(), vec!["design".to_string()]);

    let err = db.create_session(&session).unwrap_err();
    assert!(matches!(err, CohortError::PlanNotFound { .. }));
}

#[test]
fn test_invalid_roster_is_rejected_before_write() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    let session = SessionRecord::new(
        "sess-1",
        workorder(),
        vec!["design".to_string(), "design".to_string()],
    );

    let err = db.create_session(&session).unwrap_err();
    assert!(matches!(err, CohortError::SchemaViolation { .. }));
    assert!(db.get_session("sess-1").unwrap().is_none());
}

#[test]
fn test_status_record_requires_owner_token() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    store_session(&mut db, "sess-1");

    let mut record = agent_record("A");
    let token = db.register_status_record(&record).unwrap();
    record.outputs.push("design doc drafted".to_string());

    let err = db
        .save_status_record(&record, &OwnerToken::generate())
        .unwrap_err();
    assert!(matches!(err, CohortError::OwnershipViolation { .. }));
    let stored = db.get_status_record("sess-1", "A").unwrap().unwrap();
    assert!(stored.outputs.is_empty());

    db.save_status_record(&record, &token).unwrap();
    let stored = db.get_status_record("sess-1", "A").unwrap().unwrap();
    assert_eq!(stored.outputs, vec!["design doc drafted"]);
}

#[test]
fn test_schema_violation_leaves_record_untouched() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    store_session(&mut db, "sess-1");

    let record = agent_record("A");
    let token = db.register_status_record(&record).unwrap();

    let mut broken = record.clone();
    broken.tasks[0].status = TaskStatus::Complete;
    let err = db.save_status_record(&broken, &token).unwrap_err();

    assert!(matches!(err, CohortError::SchemaViolation { .. }));
    assert_eq!(db.get_status_record("sess-1", "A").unwrap().unwrap(), record);
}

#[test]
fn test_stale_copy_cannot_overwrite_newer_record() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    store_session(&mut db, "sess-1");

    let record = agent_record("A");
    let token = db.register_status_record(&record).unwrap();

    let mut newer = record.clone();
    let done_at = Timestamp::now();
    newer.tasks[0].status = TaskStatus::Complete;
    newer.tasks[0].completed_at = Some(done_at);
    newer.history.push(HistoryEntry {
        task_id: "AUTH-001".to_string(),
        from: TaskStatus::NotStarted,
        to: TaskStatus::Complete,
        at: done_at,
        note: None,
    });
    db.save_status_record(&newer, &token).unwrap();

    let mut stale = record;
    stale.outputs.push("design doc drafted".to_string());
    let err = db.save_status_record(&stale, &token).unwrap_err();

    assert!(matches!(err, CohortError::StaleRecord { .. }));
    let stored = db.get_status_record("sess-1", "A").unwrap().unwrap();
    assert_eq!(stored, newer);
}

#[test]
fn test_agent_cannot_register_twice() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    store_session(&mut db, "sess-1");

    db.register_status_record(&agent_record("A")).unwrap();
    let err = db.register_status_record(&agent_record("A")).unwrap_err();

    assert!(matches!(err, CohortError::InvalidInput { .. }));
}

#[test]
fn test_phase_markers_are_append_only() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    store_session(&mut db, "sess-1");

    db.append_phase_marker("sess-1", "design", Timestamp::now())
        .unwrap();
    let err = db
        .append_phase_marker("sess-1", "design", Timestamp::now())
        .unwrap_err();
    assert!(matches!(err, CohortError::InvalidInput { .. }));

    let session = db.get_session("sess-1").unwrap().unwrap();
    assert!(session.is_phase_complete("design"));
    assert_eq!(session.authorized_phase(), Some("build"));
}

#[test]
fn test_archived_sessions_are_hidden_but_kept() {
    let (_temp_file, mut db) = create_test_db();
    store_plan(&mut db);
    store_session(&mut db, "sess-1");
    store_session(&mut db, "sess-2");

    db.archive_session("sess-1").unwrap();

    let active = db.list_sessions(false).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].session_id, "sess-2");
    assert_eq!(db.list_sessions(true).unwrap().len(), 2);
    assert_eq!(
        db.get_session("sess-1").unwrap().unwrap().status,
        SessionStatus::Archived
    );
}

#[test]
fn test_records_survive_reopen() {
    let temp_file = NamedTempFile::new().unwrap();
    {
        let mut db = Database::new(temp_file.path()).unwrap();
        store_plan(&mut db);
        store_session(&mut db, "sess-1");
        db.register_status_record(&agent_record("A")).unwrap();
        db.register_status_record(&agent_record("B")).unwrap();
    }

    let db = Database::new(temp_file.path()).unwrap();
    let records = db.list_status_records("sess-1").unwrap();
    let agents: Vec<&str> = records.iter().map(|r| r.agent_id.as_str()).collect();
    assert_eq!(agents, vec!["A", "B"]);
}
