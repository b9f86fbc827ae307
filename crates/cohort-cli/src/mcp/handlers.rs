//! MCP tool handler implementations.

use cohort_core::{params as core, Coordinator};
use log::debug;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    ErrorData,
};
use schemars::JsonSchema;
use serde::Deserialize;

use super::errors::to_mcp_error;

/// Transparent wrapper giving core parameter types the derives rmcp needs.
///
/// `#[serde(transparent)]` passes (de)serialisation straight through, and the
/// schema is the wrapped type's, so core params stay free of MCP concerns.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct McpParams<T>(T)
where
    T: JsonSchema;

impl<T> JsonSchema for McpParams<T>
where
    T: JsonSchema,
{
    fn schema_name() -> std::borrow::Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(g: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(g)
    }
}

impl<T> AsRef<T> for McpParams<T>
where
    T: JsonSchema,
{
    fn as_ref(&self) -> &T {
        &self.0
    }
}

pub type ValidatePlan = McpParams<core::ValidatePlan>;
pub type SessionRef = McpParams<core::SessionRef>;
pub type CheckGate = McpParams<core::CheckGate>;
pub type SetTaskStatus = McpParams<core::SetTaskStatus>;
pub type RecordOutput = McpParams<core::RecordOutput>;

pub type McpResult = Result<CallToolResult, ErrorData>;

fn markdown(text: impl Into<String>) -> McpResult {
    Ok(CallToolResult::success(vec![Content::text(text.into())]))
}

/// Handler implementations for the MCP server
pub struct McpHandlers {
    coordinator: Coordinator,
}

impl McpHandlers {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    pub async fn validate_plan(&self, Parameters(params): Parameters<ValidatePlan>) -> McpResult {
        debug!("validate_plan: {:?}", params);
        let report = self
            .coordinator
            .validate(params.as_ref())
            .await
            .map_err(|e| to_mcp_error("Failed to validate plan", &e))?;
        markdown(report.to_string())
    }

    pub async fn check_gate(&self, Parameters(params): Parameters<CheckGate>) -> McpResult {
        debug!("check_gate: {:?}", params);
        let outcome = self
            .coordinator
            .check_gate(params.as_ref())
            .await
            .map_err(|e| to_mcp_error("Failed to check gate", &e))?;
        markdown(outcome.to_string())
    }

    pub async fn audit_conflicts(&self, Parameters(params): Parameters<SessionRef>) -> McpResult {
        debug!("audit_conflicts: {:?}", params);
        let report = self
            .coordinator
            .audit_conflicts(&params.as_ref().session_id)
            .await
            .map_err(|e| to_mcp_error("Failed to audit session", &e))?;
        markdown(report.to_string())
    }

    pub async fn set_task_status(
        &self,
        Parameters(params): Parameters<SetTaskStatus>,
    ) -> McpResult {
        let inner = params.as_ref();
        // Tokens are never logged.
        debug!(
            "set_task_status: {}/{} {} -> {}",
            inner.session_id, inner.agent_id, inner.task_id, inner.status
        );
        let entry = self
            .coordinator
            .set_task_status(inner)
            .await
            .map_err(|e| to_mcp_error("Failed to update task", &e))?;
        markdown(format!(
            "Task {} moved from {} to {} at {}.",
            entry.task_id,
            entry.from,
            entry.to,
            cohort_core::LocalDateTime(&entry.at)
        ))
    }

    pub async fn record_output(&self, Parameters(params): Parameters<RecordOutput>) -> McpResult {
        let inner = params.as_ref();
        debug!("record_output: {}/{}", inner.session_id, inner.agent_id);
        self.coordinator
            .record_output(inner)
            .await
            .map_err(|e| to_mcp_error("Failed to record output", &e))?;
        markdown(format!("Output recorded for agent {}.", inner.agent_id))
    }

    pub async fn synthesize_session(
        &self,
        Parameters(params): Parameters<SessionRef>,
    ) -> McpResult {
        debug!("synthesize_session: {:?}", params);
        let report = self
            .coordinator
            .synthesize(&params.as_ref().session_id)
            .await
            .map_err(|e| to_mcp_error("Failed to synthesize session", &e))?;
        markdown(report.to_string())
    }

    pub async fn show_session(&self, Parameters(params): Parameters<SessionRef>) -> McpResult {
        debug!("show_session: {:?}", params);
        let session_id = &params.as_ref().session_id;
        let session = self
            .coordinator
            .get_session(session_id)
            .await
            .map_err(|e| to_mcp_error("Failed to get session", &e))?;
        let records = self
            .coordinator
            .status_records(session_id)
            .await
            .map_err(|e| to_mcp_error("Failed to read status records", &e))?;
        markdown(format!(
            "{session}\n## Agents\n\n{}",
            cohort_core::display::StatusRecords(records)
        ))
    }
}
