//! Session lifecycle operations for the Coordinator.

use std::path::PathBuf;

use jiff::Timestamp;
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use super::Coordinator;
use crate::{
    agent::{AgentActor, AgentHandle},
    db::TaskClaim,
    error::{CohortError, Result},
    export::{RecordExporter, SessionBundle},
    gate::{self, GateOutcome},
    guard::{ConflictGuard, ConflictReport},
    models::{
        HistoryEntry, OwnerToken, SessionRecord, SessionStatus, SessionSummary, StatusRecord,
        TaskStatus,
    },
    params::{
        ArchiveSession, AssignAgent, CheckGate, CreateSession, ExportSession, RecordOutput,
        SetTaskStatus,
    },
    synthesis::{self, SessionReport},
};

/// An agent added to a session, with the write capability for its record.
#[derive(Debug, Clone, Serialize)]
pub struct AgentAssignment {
    pub record: StatusRecord,
    pub token: OwnerToken,
}

/// Result of closing a phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseAdvance {
    pub session_id: String,
    pub completed_phase: String,
    /// Phase now authorised; `None` once the final phase is done
    pub authorized_phase: Option<String>,
    pub status: SessionStatus,
}

/// Result of archiving a session.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutcome {
    pub session_id: String,
    pub report: SessionReport,
    /// Where the archive copy was written, if requested
    pub export_dir: Option<PathBuf>,
}

impl Coordinator {
    /// Creates a session in `planning` for a plan whose stored validation
    /// passed. One roster entry is created per plan phase.
    ///
    /// # Errors
    ///
    /// * [`CohortError::PlanNotFound`] if the plan is not stored
    /// * [`CohortError::InvalidInput`] if the plan has not passed the gate
    pub async fn create_session(&self, params: &CreateSession) -> Result<SessionRecord> {
        let stored = self.get_plan(&params.workorder_id).await?;
        if !stored.passed() {
            let score = stored
                .last_score
                .map_or_else(|| "unscored".to_string(), |score| score.to_string());
            return Err(CohortError::invalid_input("workorder_id").with_reason(format!(
                "plan {} has not passed validation (score {score})",
                stored.workorder_id
            )));
        }

        let session_id = params
            .session_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_session_id);
        let session = SessionRecord::new(session_id, stored.workorder_id, stored.plan.phase_order());

        let created = session.clone();
        self.with_db(move |db| db.create_session(&created)).await?;
        info!(
            "Created session {} for plan {}",
            session.session_id, session.workorder_id
        );

        Ok(session)
    }

    /// Retrieves a session.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionRecord> {
        let id = session_id.to_string();
        self.with_db(move |db| db.get_session(&id))
            .await?
            .ok_or_else(|| CohortError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Lists sessions as summaries.
    pub async fn list_sessions(&self, include_archived: bool) -> Result<Vec<SessionSummary>> {
        let sessions = self
            .with_db(move |db| db.list_sessions(include_archived))
            .await?;
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }

    /// Point-in-time snapshots of every status record in a session.
    pub async fn status_records(&self, session_id: &str) -> Result<Vec<StatusRecord>> {
        let id = session_id.to_string();
        self.with_db(move |db| db.list_status_records(&id)).await
    }

    /// Adds an agent to a phase, registers its status record and starts its
    /// actor.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SessionState`] unless the session is in `planning`
    /// * [`CohortError::InvalidInput`] for an unknown phase, a task outside
    ///   the phase or a task already assigned to another agent
    pub async fn assign_agent(&self, params: &AssignAgent) -> Result<AgentAssignment> {
        let session = self.get_session(&params.session_id).await?;
        require_status(&session, &[SessionStatus::Planning], "agents can only join while planning")?;

        let plan = self.get_plan(session.workorder_id.as_str()).await?.plan;
        let claim = if params.tasks.is_empty() {
            TaskClaim::Remaining(
                plan.tasks_in_phase(&params.phase)
                    .map(|task| task.id.clone())
                    .collect(),
            )
        } else {
            for task_id in &params.tasks {
                match plan.task(task_id) {
                    Some(task) if task.phase == params.phase => {}
                    Some(task) => {
                        return Err(CohortError::invalid_input("tasks").with_reason(format!(
                            "task {task_id} belongs to phase '{}', not '{}'",
                            task.phase, params.phase
                        )));
                    }
                    None => {
                        return Err(CohortError::invalid_input("tasks")
                            .with_reason(format!("plan has no task {task_id}")));
                    }
                }
            }
            TaskClaim::Exact(params.tasks.clone())
        };

        let mut record = StatusRecord::new(
            &params.session_id,
            &params.agent_id,
            session.workorder_id.clone(),
            &params.phase,
            Vec::new(),
        );
        record.forbidden_paths = params.forbidden_paths.clone();
        record.claimed_paths = params.claimed_paths.clone();

        let (record, token) = self
            .with_db(move |db| db.join_session(record, claim))
            .await?;

        let handle = AgentActor::spawn(
            record.clone(),
            token,
            self.db_path.clone(),
            self.mailbox_capacity,
        );
        self.register_handle(handle).await;
        info!(
            "Assigned agent {} to phase '{}' of session {} with {} task(s)",
            record.agent_id,
            record.phase,
            record.session_id,
            record.tasks.len()
        );

        Ok(AgentAssignment { record, token })
    }

    /// Runs the pre-flight conflict audit.
    ///
    /// A clean audit moves a `planning` session to `audited`; conflicts move
    /// an `audited` session back to `planning`.
    pub async fn audit_conflicts(&self, session_id: &str) -> Result<ConflictReport> {
        let session = self.get_session(session_id).await?;
        require_status(
            &session,
            &[SessionStatus::Planning, SessionStatus::Audited],
            "the conflict audit runs before execution",
        )?;

        let records = self.status_records(session_id).await?;
        let report = ConflictGuard::new(&records).audit();

        let next = if report.is_clean() {
            SessionStatus::Audited
        } else {
            SessionStatus::Planning
        };
        if next != session.status {
            let id = session_id.to_string();
            self.with_db(move |db| db.set_session_status(&id, next))
                .await?;
        }

        Ok(report)
    }

    /// Starts execution: re-checks the audit, locks the plan and moves the
    /// session to `running`.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SessionState`] unless the session is `audited`
    /// * [`CohortError::ConflictsUnresolved`] if the audit no longer passes
    pub async fn start(&self, session_id: &str) -> Result<SessionRecord> {
        let session = self.get_session(session_id).await?;
        require_status(
            &session,
            &[SessionStatus::Audited],
            "a clean conflict audit is required before start",
        )?;

        let records = self.status_records(session_id).await?;
        let report = ConflictGuard::new(&records).audit();
        if !report.is_clean() {
            return Err(CohortError::ConflictsUnresolved {
                session_id: session_id.to_string(),
                conflicts: report.conflicts.len(),
            });
        }

        let id = session_id.to_string();
        let workorder_id = session.workorder_id.to_string();
        self.with_db(move |db| {
            db.lock_plan(&workorder_id)?;
            db.set_session_status(&id, SessionStatus::Running)
        })
        .await?;
        info!("Session {session_id} is running");

        self.get_session(session_id).await
    }

    /// Evaluates a phase gate. Read-only and safe to poll.
    pub async fn check_gate(&self, params: &CheckGate) -> Result<GateOutcome> {
        let session = self.get_session(&params.session_id).await?;
        let phase = match &params.phase {
            Some(phase) => phase.clone(),
            None => session
                .authorized_phase()
                .or_else(|| session.final_phase())
                .unwrap_or_default()
                .to_string(),
        };
        let records = self.status_records(&params.session_id).await?;
        Ok(gate::can_advance(&session, &records, &phase))
    }

    /// Phase whose work is currently authorised, or `None` when every phase
    /// is complete.
    pub async fn authorized_phase(&self, session_id: &str) -> Result<Option<String>> {
        let session = self.get_session(session_id).await?;
        Ok(session.authorized_phase().map(String::from))
    }

    /// Closes the authorised phase if its gate passes and authorises the
    /// next one. Closing the final phase completes the session.
    ///
    /// # Errors
    ///
    /// * [`CohortError::SessionState`] unless the session is `running`
    /// * [`CohortError::GateClosed`] listing the blockers otherwise
    pub async fn advance_phase(&self, session_id: &str) -> Result<PhaseAdvance> {
        let session = self.get_session(session_id).await?;
        require_status(&session, &[SessionStatus::Running], "phases advance only while running")?;

        let phase = session
            .authorized_phase()
            .ok_or_else(|| CohortError::SessionState {
                session_id: session_id.to_string(),
                status: session.status.as_str().to_string(),
                reason: "every phase is already complete".to_string(),
            })?
            .to_string();

        let records = self.status_records(session_id).await?;
        let outcome = gate::can_advance(&session, &records, &phase);
        if !outcome.advance {
            warn!(
                "Gate for phase '{phase}' of session {session_id} is closed by {} blocker(s)",
                outcome.blockers.len()
            );
            return Err(CohortError::GateClosed {
                phase,
                blockers: outcome.blockers,
            });
        }

        let is_final = session.final_phase() == Some(phase.as_str());
        let id = session_id.to_string();
        let marked = phase.clone();
        self.with_db(move |db| {
            db.append_phase_marker(&id, &marked, Timestamp::now())?;
            if is_final {
                db.set_session_status(&id, SessionStatus::Complete)?;
            }
            Ok(())
        })
        .await?;

        let session = self.get_session(session_id).await?;
        info!("Phase '{phase}' of session {session_id} passed its gate");
        Ok(PhaseAdvance {
            session_id: session.session_id.clone(),
            completed_phase: phase,
            authorized_phase: session.authorized_phase().map(String::from),
            status: session.status,
        })
    }

    /// Builds the consolidated report of a completed session.
    pub async fn synthesize(&self, session_id: &str) -> Result<SessionReport> {
        let session = self.get_session(session_id).await?;
        require_status(
            &session,
            &[SessionStatus::Complete, SessionStatus::Archived],
            "synthesis needs a completed session",
        )?;
        let plan = self.get_plan(session.workorder_id.as_str()).await?.plan;
        let records = self.status_records(session_id).await?;
        synthesis::synthesize(&session, &plan, &records)
    }

    /// Archives a completed session: stops its actors, optionally writes the
    /// archive copy and marks it `archived`. Rows are kept.
    pub async fn archive(&self, params: &ArchiveSession) -> Result<ArchiveOutcome> {
        let session = self.get_session(&params.session_id).await?;
        require_status(
            &session,
            &[SessionStatus::Complete],
            "only completed sessions can be archived",
        )?;

        let report = self.synthesize(&params.session_id).await?;
        self.stop_agents(&params.session_id).await;

        let export_dir = match &params.directory {
            Some(directory) => {
                let plan = self.get_plan(session.workorder_id.as_str()).await?.plan;
                let records = self.status_records(&params.session_id).await?;
                let exporter = RecordExporter::new(directory);
                let bundle = SessionBundle {
                    plan: &plan,
                    session: &session,
                    records: &records,
                    report: Some(&report),
                };
                Some(exporter.archive(&bundle)?)
            }
            None => None,
        };

        let id = params.session_id.clone();
        self.with_db(move |db| db.archive_session(&id)).await?;
        info!("Archived session {}", params.session_id);

        Ok(ArchiveOutcome {
            session_id: params.session_id.clone(),
            report,
            export_dir,
        })
    }

    /// Writes a JSON snapshot of a session, including the report once the
    /// session is complete.
    pub async fn export(&self, params: &ExportSession) -> Result<PathBuf> {
        let session = self.get_session(&params.session_id).await?;
        let plan = self.get_plan(session.workorder_id.as_str()).await?.plan;
        let records = self.status_records(&params.session_id).await?;
        let report = match session.status {
            SessionStatus::Complete | SessionStatus::Archived => {
                Some(synthesis::synthesize(&session, &plan, &records)?)
            }
            _ => None,
        };

        RecordExporter::new(&params.directory).export(&SessionBundle {
            plan: &plan,
            session: &session,
            records: &records,
            report: report.as_ref(),
        })
    }

    /// Returns a handle to the agent's actor after checking `token`.
    ///
    /// Reuses the live actor when this coordinator started it, otherwise
    /// re-attaches a new actor to the stored record.
    pub async fn attach_agent(
        &self,
        session_id: &str,
        agent_id: &str,
        token: &OwnerToken,
    ) -> Result<AgentHandle> {
        let (sid, aid, owner) = (session_id.to_string(), agent_id.to_string(), *token);
        let record = self
            .with_db(move |db| {
                db.verify_owner(&sid, &aid, &owner)?;
                db.get_status_record(&sid, &aid)
            })
            .await?
            .ok_or_else(|| CohortError::AgentNotFound {
                session_id: session_id.to_string(),
                agent_id: agent_id.to_string(),
            })?;

        if let Some(handle) = self.agent(session_id, agent_id).await {
            return Ok(handle);
        }

        let handle = AgentActor::spawn(record, *token, self.db_path.clone(), self.mailbox_capacity);
        self.register_handle(handle.clone()).await;
        Ok(handle)
    }

    /// Changes a task status on behalf of its owning agent.
    ///
    /// Only tasks of the authorised phase may move to `in_progress` or
    /// `complete`; any phase may report `blocked`.
    pub async fn set_task_status(&self, params: &SetTaskStatus) -> Result<HistoryEntry> {
        let status: TaskStatus = params
            .status
            .parse()
            .map_err(|reason: String| CohortError::invalid_input("status").with_reason(reason))?;
        let token: OwnerToken = params.token.parse()?;

        let handle = self
            .attach_agent(&params.session_id, &params.agent_id, &token)
            .await?;
        let session = self.get_session(&params.session_id).await?;
        require_status(&session, &[SessionStatus::Running], "task updates need a running session")?;

        if status != TaskStatus::Blocked {
            let record = handle.snapshot().await?;
            let authorized = session.authorized_phase();
            if authorized != Some(record.phase.as_str()) {
                return Err(CohortError::SessionState {
                    session_id: session.session_id.clone(),
                    status: session.status.as_str().to_string(),
                    reason: format!(
                        "phase '{}' is not authorised yet (current: {})",
                        record.phase,
                        authorized.unwrap_or("none")
                    ),
                });
            }
        }

        handle
            .set_status(params.task_id.clone(), status, params.note.clone())
            .await
    }

    /// Records a deliverable on behalf of its owning agent.
    pub async fn record_output(&self, params: &RecordOutput) -> Result<()> {
        let token: OwnerToken = params.token.parse()?;
        let handle = self
            .attach_agent(&params.session_id, &params.agent_id, &token)
            .await?;
        handle.record_output(params.output.clone()).await
    }
}

fn require_status(session: &SessionRecord, allowed: &[SessionStatus], reason: &str) -> Result<()> {
    if allowed.contains(&session.status) {
        Ok(())
    } else {
        Err(CohortError::SessionState {
            session_id: session.session_id.clone(),
            status: session.status.as_str().to_string(),
            reason: reason.to_string(),
        })
    }
}

fn new_session_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("sess-{}", &id[..8])
}
