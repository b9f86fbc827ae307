//! MCP server for Cohort
//!
//! Exposes the coordinator operations an executing agent needs (plan
//! validation, gate checks, the conflict audit, status updates and
//! synthesis) over the Model Context Protocol on stdio.


use anyhow::Result;
use cohort_core::Coordinator;
use log::{debug, error, info};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;

pub use handlers::{CheckGate, McpResult, RecordOutput, SessionRef, SetTaskStatus, ValidatePlan};

const INSTRUCTIONS: &str = r#"Cohort coordinates several agents executing one validated plan.

## Core Concepts
- **Plan**: a work order (WO-<SLUG>-<NNN>) with ten canonical sections and phased tasks, scored 0-100 by the quality gate
- **Session**: one execution of a plan; agents are assigned to phases and only the authorised phase may progress
- **Status record**: each agent's own task list; only the agent holding the owner token may change it

## Workflow
1. `validate_plan` a document (or a stored work order) until it passes (score >= 90, no critical issues)
2. `audit_conflicts` before the session starts; overlapping path claims must be resolved
3. While working, report progress with `set_task_status` (not_started, in_progress, blocked, complete) and deliverables with `record_output`
4. Poll `check_gate` to see what still blocks the current phase
5. After the final phase, `synthesize_session` produces the consolidated report

## Rules
- `complete` is final; `blocked` may only return to `in_progress`
- Tasks of later phases may be reported `blocked` but cannot start before their phase is authorised"#;

/// MCP server for Cohort
#[derive(Clone)]
pub struct CohortMcpServer {
    coordinator: Coordinator,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CohortMcpServer {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            tool_router: Self::tool_router(),
        }
    }

    fn handlers(&self) -> handlers::McpHandlers {
        handlers::McpHandlers::new(self.coordinator.clone())
    }

    #[tool(
        name = "validate_plan",
        description = "Score a plan against the quality gate. Pass either workorder_id (a stored plan; the score is recorded) or document (plan JSON text; nothing is stored). Returns score 0-100, the decision (pass, needs_refinement, manual_revision) and every issue with severity, rule code and location."
    )]
    async fn validate_plan(&self, params: Parameters<ValidatePlan>) -> McpResult {
        self.handlers().validate_plan(params).await
    }

    #[tool(
        name = "check_gate",
        description = "Check whether a phase of a session is finished. Read-only and safe to poll. Defaults to the currently authorised phase. Returns whether the phase may advance and, if not, which agent/task pairs are holding it back."
    )]
    async fn check_gate(&self, params: Parameters<CheckGate>) -> McpResult {
        self.handlers().check_gate(params).await
    }

    #[tool(
        name = "audit_conflicts",
        description = "Run the pre-flight conflict audit of a session that has not started yet. Reports paths claimed by two agents, claims inside another agent's forbidden paths and agents claiming paths they forbid themselves. A clean audit allows the session to start."
    )]
    async fn audit_conflicts(&self, params: Parameters<SessionRef>) -> McpResult {
        self.handlers().audit_conflicts(params).await
    }

    #[tool(
        name = "set_task_status",
        description = "Change the status of one of your tasks. Requires the owner token issued when you were assigned. Status is not_started, in_progress, blocked or complete (done is accepted). Complete is final; blocked may only go back to in_progress. An optional note is kept in the task history."
    )]
    async fn set_task_status(&self, params: Parameters<SetTaskStatus>) -> McpResult {
        self.handlers().set_task_status(params).await
    }

    #[tool(
        name = "record_output",
        description = "Record a deliverable (what you produced, where it lives, what was verified). Requires your owner token. Outputs are used when the session's success criteria are checked."
    )]
    async fn record_output(&self, params: Parameters<RecordOutput>) -> McpResult {
        self.handlers().record_output(params).await
    }

    #[tool(
        name = "show_session",
        description = "Show a session: status, authorised phase, roster per phase and every agent's task statuses and outputs."
    )]
    async fn show_session(&self, params: Parameters<SessionRef>) -> McpResult {
        self.handlers().show_session(params).await
    }

    #[tool(
        name = "synthesize_session",
        description = "Build the consolidated report of a completed session: completion per phase and agent, elapsed time, blocked transitions and pass/fail for each success criterion of the plan."
    )]
    async fn synthesize_session(&self, params: Parameters<SessionRef>) -> McpResult {
        self.handlers().synthesize_session(params).await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for CohortMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

/// Run the MCP server with stdio transport
pub async fn run_stdio_server(server: CohortMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting Cohort MCP server on stdio");
    debug!(
        "Server created with {} tools",
        server.tool_router.list_all().len()
    );

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    info!("MCP server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use cohort_core::CoordinatorBuilder;

    use super::*;

    #[tokio::test]
    async fn test_server_registers_tools() {
        let temp_dir = tempfile::tempdir().unwrap();
        let coordinator = CoordinatorBuilder::new()
            .with_database_path(Some(temp_dir.path().join("mcp.db")))
            .build()
            .await
            .unwrap();
        let server = CohortMcpServer::new(coordinator);

        let names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        for expected in [
            "validate_plan",
            "check_gate",
            "audit_conflicts",
            "set_task_status",
            "synthesize_session",
        ] {
            assert!(names.iter().any(|name| name == expected), "missing {expected}");
        }
        assert!(server.get_info().instructions.is_some());
    }
}
