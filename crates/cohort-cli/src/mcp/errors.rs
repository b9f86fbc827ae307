//! Error conversion for MCP responses.

use cohort_core::CohortError;
use rmcp::ErrorData;

/// Converts a coordinator error into an MCP error.
///
/// Rejections caused by the request (bad input, unknown ids, lifecycle and
/// ownership rules) become `invalid_params`; storage failures become
/// `internal_error`.
pub fn to_mcp_error(message: &str, error: &CohortError) -> ErrorData {
    let text = format!("{message}: {error}");
    match error {
        CohortError::Database { .. }
        | CohortError::FileSystem { .. }
        | CohortError::XdgDirectory(_)
        | CohortError::Serialization { .. }
        | CohortError::Configuration { .. }
        | CohortError::AgentStopped { .. } => ErrorData::internal_error(text, None),
        _ => ErrorData::invalid_params(text, None),
    }
}

#[cfg(test)]
mod tests {
    use rmcp::model::ErrorCode;

    use super::*;

    #[test]
    fn test_rule_violations_are_invalid_params() {
        let error = CohortError::PlanLocked {
            workorder_id: "WO-AUTH-001".to_string(),
        };
        let mcp = to_mcp_error("Failed to import plan", &error);
        assert_eq!(mcp.code, ErrorCode::INVALID_PARAMS);
        assert!(mcp.message.starts_with("Failed to import plan: "));
    }

    #[test]
    fn test_storage_failures_are_internal() {
        let error = CohortError::XdgDirectory("no home".to_string());
        assert_eq!(
            to_mcp_error("Failed", &error).code,
            ErrorCode::INTERNAL_ERROR
        );
    }
}
