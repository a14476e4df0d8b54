//! MCP tool implementations.
//!
//! - `issues` - Jira and Linear issue creation (2 tools)
//! - `github` - advanced GitHub operations, including batches (1 tool)
//! - `project` - scaffolding and context analysis (2 tools)

pub mod github;
pub mod issues;
pub mod project;

use crate::error::Result;
use crate::integrations::OperationOutcome;
use crate::mcp::handler::{error_result, success_result, McpHandler};
use crate::mcp::protocol::ToolResult;
use crate::service::Services;

/// Register all tools with the handler, in catalog order.
pub fn register_all_tools(handler: &mut McpHandler, services: &Services) -> Result<()> {
    handler.register(issues::JiraCreateIssueTool::new(services.jira.clone()))?;
    handler.register(issues::LinearCreateIssueTool::new(services.linear.clone()))?;
    handler.register(github::GitHubAdvancedTool::new(
        services.github.clone(),
        services.workspace.clone(),
    ))?;
    handler.register(project::ProjectScaffoldTool::new(
        services.scaffolder.clone(),
        services.workspace.clone(),
    ))?;
    handler.register(project::ContextAnalyzeTool::new(services.workspace.clone()))?;
    Ok(())
}

/// Tool result for a collaborator outcome: the JSON outcome on success,
/// the bare error message (flagged as an error) on failure.
pub(crate) fn outcome_result(outcome: &OperationOutcome) -> Result<ToolResult> {
    match outcome.error() {
        Some(error) => Ok(error_result(error)),
        None => Ok(success_result(serde_json::to_string_pretty(outcome)?)),
    }
}
