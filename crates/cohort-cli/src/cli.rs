//! Command handlers for the `cohort` binary.
//!
//! Each handler calls one coordinator operation and renders the markdown
//! `Display` output of its result.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use cohort_core::{
    display::{OperationStatus, PlanListing, SessionSummaries, StatusRecords},
    params::CheckGate,
    Coordinator, PlanValidator,
};
use log::debug;

use crate::{
    args::{ListSessionsArgs, PlanCommands, SessionCommands, TaskCommands, ValidateArgs},
    renderer::TerminalRenderer,
};

/// Runs CLI commands against one coordinator.
pub struct Cli {
    coordinator: Coordinator,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(coordinator: Coordinator, renderer: TerminalRenderer) -> Self {
        Self {
            coordinator,
            renderer,
        }
    }

    pub async fn handle_plan_command(&self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::Validate(args) => self.validate_plan(&args),
            PlanCommands::Import(args) => {
                let source = read_plan(&args.file)?;
                let imported = self
                    .coordinator
                    .import_plan(&source)
                    .await
                    .context("Failed to import plan")?;
                self.renderer.render(&imported.to_string())
            }
            PlanCommands::Show(args) => {
                let plan = self
                    .coordinator
                    .get_plan(&args.workorder_id)
                    .await
                    .context("Failed to get plan")?;
                self.renderer.render(&plan.to_string())
            }
            PlanCommands::List => {
                let plans = self
                    .coordinator
                    .list_plans()
                    .await
                    .context("Failed to list plans")?;
                let title = if plans.is_empty() {
                    "No plans found"
                } else {
                    "Plans"
                };
                self.renderer
                    .render(&format!("# {title}\n\n{}", PlanListing(plans)))
            }
            PlanCommands::Refine(args) => {
                let outcome = self
                    .coordinator
                    .refine_plan(&args.workorder_id)
                    .await
                    .context("Failed to refine plan")?;
                self.renderer.render(&outcome.to_string())
            }
        }
    }

    /// Scores a document with the configured validator; a plan that does not
    /// pass exits with an error after the report is printed.
    fn validate_plan(&self, args: &ValidateArgs) -> Result<()> {
        let source = read_plan(&args.file)?;
        let report = match args.min_section_length {
            Some(length) => {
                let config = self
                    .coordinator
                    .validator()
                    .config()
                    .clone()
                    .with_min_section_length(length);
                PlanValidator::new(config).validate_source(&source)
            }
            None => self.coordinator.validate_source(&source),
        };
        self.renderer.render(&report.to_string())?;

        if !report.passed() {
            bail!("Plan did not pass: {} ({}/100)", report.decision, report.score);
        }
        Ok(())
    }

    pub async fn handle_session_command(&self, command: SessionCommands) -> Result<()> {
        match command {
            SessionCommands::Create(args) => {
                let session = self
                    .coordinator
                    .create_session(&args.into())
                    .await
                    .context("Failed to create session")?;
                self.renderer.render(&session.to_string())
            }
            SessionCommands::List(args) => {
                let sessions = self
                    .coordinator
                    .list_sessions(args.archived)
                    .await
                    .context("Failed to list sessions")?;
                let title = match (sessions.is_empty(), args.archived) {
                    (true, _) => "No sessions found",
                    (false, true) => "All Sessions",
                    (false, false) => "Active Sessions",
                };
                self.renderer
                    .render(&format!("# {title}\n\n{}", SessionSummaries(sessions)))
            }
            SessionCommands::Show(args) => {
                let session = self
                    .coordinator
                    .get_session(&args.session_id)
                    .await
                    .context("Failed to get session")?;
                let records = self
                    .coordinator
                    .status_records(&args.session_id)
                    .await
                    .context("Failed to read status records")?;
                self.renderer.render(&format!(
                    "{session}\n## Agents\n\n{}",
                    StatusRecords(records)
                ))
            }
            SessionCommands::Assign(args) => {
                let assignment = self
                    .coordinator
                    .assign_agent(&args.into())
                    .await
                    .context("Failed to assign agent")?;
                self.renderer.render(&assignment.to_string())
            }
            SessionCommands::Audit(args) => {
                let report = self
                    .coordinator
                    .audit_conflicts(&args.session_id)
                    .await
                    .context("Failed to audit session")?;
                self.renderer.render(&report.to_string())
            }
            SessionCommands::Start(args) => {
                let session = self
                    .coordinator
                    .start(&args.session_id)
                    .await
                    .context("Failed to start session")?;
                self.renderer.render(&session.to_string())
            }
            SessionCommands::Gate(args) => {
                let params: CheckGate = args.into();
                let outcome = self
                    .coordinator
                    .check_gate(&params)
                    .await
                    .context("Failed to check gate")?;
                self.renderer.render(&outcome.to_string())
            }
            SessionCommands::Advance(args) => {
                let advance = self
                    .coordinator
                    .advance_phase(&args.session_id)
                    .await
                    .context("Failed to advance phase")?;
                self.renderer.render(&advance.to_string())
            }
            SessionCommands::Synthesize(args) => {
                let report = self
                    .coordinator
                    .synthesize(&args.session_id)
                    .await
                    .context("Failed to synthesize session")?;
                self.renderer.render(&report.to_string())
            }
            SessionCommands::Archive(args) => {
                let outcome = self
                    .coordinator
                    .archive(&args.into())
                    .await
                    .context("Failed to archive session")?;
                self.renderer.render(&outcome.to_string())
            }
            SessionCommands::Export(args) => {
                let dir = self
                    .coordinator
                    .export(&args.into())
                    .await
                    .context("Failed to export session")?;
                let status = OperationStatus::success(format!("Exported to {}", dir.display()));
                self.renderer.render(&status.to_string())
            }
        }
    }

    pub async fn handle_task_command(&self, command: TaskCommands) -> Result<()> {
        match command {
            TaskCommands::Set(args) => {
                let entry = self
                    .coordinator
                    .set_task_status(&args.into())
                    .await
                    .context("Failed to update task")?;
                let status = OperationStatus::success(format!(
                    "Task {} moved from {} to {}",
                    entry.task_id, entry.from, entry.to
                ));
                self.renderer.render(&status.to_string())
            }
            TaskCommands::Output(args) => {
                let agent_id = args.agent_id.clone();
                self.coordinator
                    .record_output(&args.into())
                    .await
                    .context("Failed to record output")?;
                let status = OperationStatus::success(format!("Output recorded for agent {agent_id}"));
                self.renderer.render(&status.to_string())
            }
        }
    }

    /// Default view when no command is given.
    pub async fn list_sessions(&self) -> Result<()> {
        self.handle_session_command(SessionCommands::List(ListSessionsArgs {
            archived: false,
        }))
        .await
    }
}

fn read_plan(path: &Path) -> Result<String> {
    debug!("Reading plan from {}", path.display());
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
