#[cfg(test)]
mod model_tests {
    use indexmap::IndexMap;
    use jiff::Timestamp;

    use crate::{
        error::CohortError,
        models::{
            HistoryEntry, PhaseMarker, PlanRecord, PlanTask, SessionRecord, SessionStatus,
            SessionSummary, StatusRecord, TaskStatus, WorkorderId,
        },
    };

    fn workorder() -> WorkorderId {
        "WO-MODEL-001".parse().unwrap()
    }

    fn create_test_record() -> StatusRecord {
        StatusRecord::new(
            "sess-1",
            "agent-a",
            workorder(),
            "build",
            vec!["T-1".to_string(), "T-2".to_string()],
        )
    }

    #[test]
    fn test_task_status_aliases_normalise_on_read() {
        let cases = [
            ("\"done\"", TaskStatus::Complete),
            ("\"finished\"", TaskStatus::Complete),
            ("\"pending\"", TaskStatus::NotStarted),
            ("\"todo\"", TaskStatus::NotStarted),
            ("\"inprogress\"", TaskStatus::InProgress),
            ("\"blocked\"", TaskStatus::Blocked),
        ];
        for (raw, expected) in cases {
            let parsed: TaskStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed, expected, "{raw}");
        }
        assert!(serde_json::from_str::<TaskStatus>("\"abandoned\"").is_err());
    }

    #[test]
    fn test_task_status_writes_canonical_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!("Done".parse::<TaskStatus>(), Ok(TaskStatus::Complete));
        assert!("nope".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_transition_table() {
        use TaskStatus::{Blocked, Complete, InProgress, NotStarted};

        assert!(NotStarted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Complete));
        assert!(InProgress.can_transition_to(Blocked));
        assert!(Blocked.can_transition_to(InProgress));
        assert!(NotStarted.can_transition_to(Blocked));

        assert!(!Blocked.can_transition_to(Complete));
        assert!(!InProgress.can_transition_to(NotStarted));
        assert!(!InProgress.can_transition_to(InProgress));
        for next in [NotStarted, InProgress, Blocked, Complete] {
            assert!(!Complete.can_transition_to(next));
        }
    }

    #[test]
    fn test_completion_ratio() {
        let mut record = create_test_record();
        assert_eq!(record.completion_ratio(), 0.0);

        record.tasks[0].status = TaskStatus::Complete;
        record.tasks[0].completed_at = Some(Timestamp::now());
        assert_eq!(record.completion_ratio(), 0.5);

        record.tasks.clear();
        assert_eq!(record.completion_ratio(), 1.0);
    }

    #[test]
    fn test_status_record_validation() {
        let record = create_test_record();
        assert!(record.validate().is_ok());

        let mut duplicate = create_test_record();
        duplicate.tasks[1].id = "T-1".to_string();
        assert!(matches!(
            duplicate.validate(),
            Err(CohortError::SchemaViolation { .. })
        ));

        let mut missing_stamp = create_test_record();
        missing_stamp.tasks[0].status = TaskStatus::Complete;
        assert!(missing_stamp.validate().is_err());

        let mut backwards = create_test_record();
        let later = Timestamp::from_second(1_700_000_100).unwrap();
        let earlier = Timestamp::from_second(1_700_000_000).unwrap();
        for at in [later, earlier] {
            backwards.history.push(HistoryEntry {
                task_id: "T-1".to_string(),
                from: TaskStatus::NotStarted,
                to: TaskStatus::InProgress,
                at,
                note: None,
            });
        }
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn test_status_record_json_shape() {
        let record = create_test_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["workorder_id"], "WO-MODEL-001");
        assert_eq!(json["tasks"][0]["status"], "not_started");
        assert!(json["forbidden_paths"].as_array().unwrap().is_empty());
        assert!(json.get("outputs").is_none());
    }

    #[test]
    fn test_session_authorized_phase_follows_markers() {
        let mut session = SessionRecord::new(
            "sess-1",
            workorder(),
            vec!["design".to_string(), "build".to_string()],
        );
        assert_eq!(session.authorized_phase(), Some("design"));
        assert_eq!(session.final_phase(), Some("build"));

        session.completed_phases.push(PhaseMarker {
            phase: "design".to_string(),
            passed_at: Timestamp::now(),
        });
        assert_eq!(session.authorized_phase(), Some("build"));

        session.completed_phases.push(PhaseMarker {
            phase: "build".to_string(),
            passed_at: Timestamp::now(),
        });
        assert_eq!(session.authorized_phase(), None);
    }

    #[test]
    fn test_session_validation_rejects_double_assignment() {
        let mut session = SessionRecord::new(
            "sess-1",
            workorder(),
            vec!["design".to_string(), "build".to_string()],
        );
        session.phases[0].agents.push("agent-a".to_string());
        assert!(session.validate().is_ok());

        session.phases[1].agents.push("agent-a".to_string());
        assert!(session.validate().is_err());
    }

    #[test]
    fn test_session_summary_counts() {
        let mut session = SessionRecord::new("sess-1", workorder(), vec!["build".to_string()]);
        session.phases[0].agents = vec!["a".to_string(), "b".to_string()];
        session.status = SessionStatus::Running;

        let summary = SessionSummary::from(&session);
        assert_eq!(summary.agents, 2);
        assert_eq!(summary.total_phases, 1);
        assert_eq!(summary.completed_phases, 0);
        assert_eq!(summary.authorized_phase.as_deref(), Some("build"));
    }

    #[test]
    fn test_plan_phase_order_and_criteria() {
        let mut sections = IndexMap::new();
        sections.insert(
            "success_criteria".to_string(),
            "Criteria:\n- Login works end to end\n* Tokens rotate\n1. AUTH-002 is done\n- [ ] Docs updated\n"
                .to_string(),
        );
        let task = |id: &str, phase: &str| PlanTask {
            id: id.to_string(),
            description: format!("Do {id}"),
            phase: phase.to_string(),
            dependencies: vec![],
            acceptance_criteria: None,
        };
        let plan = PlanRecord {
            workorder_id: "WO-AUTH-001".to_string(),
            title: String::new(),
            sections,
            phases: vec![],
            tasks: vec![task("A", "design"), task("B", "build"), task("C", "design")],
        };

        assert_eq!(plan.phase_order(), vec!["design", "build"]);
        assert_eq!(plan.tasks_in_phase("design").count(), 2);
        assert_eq!(
            plan.success_criteria(),
            vec![
                "Login works end to end",
                "Tokens rotate",
                "AUTH-002 is done",
                "Docs updated"
            ]
        );
    }
}
