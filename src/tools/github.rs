//! Advanced GitHub tool: issue management, batches, PRs and repository analysis.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::batch::{BatchExecutor, DEFAULT_LIST_LIMIT};
use crate::error::{Error, Result};
use crate::integrations::{non_empty_str, GitHubCli, IssueTracker};
use crate::mcp::handler::{
    error_result, get_object_arg, get_optional_string_arg, get_string_arg, success_result,
    ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::service::analyze;
use crate::tools::outcome_result;

/// Operations understood by `github_advanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubOperation {
    BulkIssueOperations,
    CreateIssue,
    UpdateIssue,
    CloseIssue,
    ListIssues,
    AnalyzeRepository,
    CreatePr,
    RepositoryInsights,
}

impl GitHubOperation {
    pub const ALL: [&'static str; 8] = [
        "bulk_issue_operations",
        "create_issue",
        "update_issue",
        "close_issue",
        "list_issues",
        "analyze_repository",
        "create_pr",
        "repository_insights",
    ];
}

impl FromStr for GitHubOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "bulk_issue_operations" => Self::BulkIssueOperations,
            "create_issue" => Self::CreateIssue,
            "update_issue" => Self::UpdateIssue,
            "close_issue" => Self::CloseIssue,
            "list_issues" => Self::ListIssues,
            "analyze_repository" => Self::AnalyzeRepository,
            "create_pr" => Self::CreatePr,
            "repository_insights" => Self::RepositoryInsights,
            other => {
                return Err(Error::InvalidParams(format!(
                    "Unknown GitHub operation: {}",
                    other
                )))
            }
        })
    }
}

/// `github_advanced` tool.
pub struct GitHubAdvancedTool {
    github: Arc<GitHubCli>,
    workspace: PathBuf,
}

impl GitHubAdvancedTool {
    pub fn new(github: Arc<GitHubCli>, workspace: PathBuf) -> Self {
        Self { github, workspace }
    }

    async fn bulk(&self, gh: GitHubCli, data: &Map<String, Value>) -> Result<ToolResult> {
        // Items are decoded one by one inside the executor.
        let operations = match data.get("operations") {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                return Err(Error::InvalidParams(
                    "data.operations must be a list of operations".to_string(),
                ))
            }
        };

        let report = BatchExecutor::new(Arc::new(gh)).execute(operations).await;
        Ok(success_result(serde_json::to_string_pretty(&report)?))
    }

    async fn list(&self, gh: &GitHubCli, data: &Map<String, Value>) -> Result<ToolResult> {
        let limit = data
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_LIST_LIMIT);
        match gh.list(non_empty_str(data, "filter"), limit).await {
            Ok(issues) => Ok(success_result(serde_json::to_string_pretty(&json!({
                "count": issues.len(),
                "issues": issues,
            }))?)),
            Err(e) => Ok(error_result(format!("Failed to list issues: {}", e))),
        }
    }

    async fn analyze_repository(
        &self,
        gh: &GitHubCli,
        data: &Map<String, Value>,
    ) -> Result<ToolResult> {
        let path = non_empty_str(data, "path")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.workspace.clone());

        let context = match tokio::task::spawn_blocking(move || analyze(&path))
            .await
            .map_err(|e| Error::Internal(format!("Repository analysis task failed: {}", e)))?
        {
            Ok(context) => context,
            Err(e) => return Ok(error_result(e.to_string())),
        };

        let mut analysis = match serde_json::to_value(&context)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if gh.cli_available() {
            analysis.insert("open_issues_count".to_string(), json!(gh.count_open("issue").await));
            analysis.insert("pr_count".to_string(), json!(gh.count_open("pr").await));
        }
        Ok(success_result(serde_json::to_string_pretty(&json!({
            "success": true,
            "analysis": analysis,
        }))?))
    }
}

#[async_trait]
impl ToolHandler for GitHubAdvancedTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "github_advanced".to_string(),
            description: "Advanced GitHub operations beyond basic gh CLI".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": GitHubOperation::ALL,
                        "description": "GitHub operation to perform"
                    },
                    "repo": {"type": "string", "description": "Repository (owner/name)"},
                    "data": {"type": "object", "description": "Operation-specific data"}
                },
                "required": ["operation"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let name = get_string_arg(&args, "operation")?;
        let operation = match name.parse::<GitHubOperation>() {
            Ok(op) => op,
            Err(e) => return Ok(error_result(e.client_message())),
        };
        let gh = self.github.with_repo(get_optional_string_arg(&args, "repo"));
        let data = get_object_arg(&args, "data");
        debug!("github_advanced {:?}", operation);

        let outcome = match operation {
            GitHubOperation::BulkIssueOperations => return self.bulk(gh, &data).await,
            GitHubOperation::ListIssues => return self.list(&gh, &data).await,
            GitHubOperation::AnalyzeRepository => return self.analyze_repository(&gh, &data).await,
            GitHubOperation::CreateIssue => gh.create(&data).await,
            GitHubOperation::UpdateIssue => gh.update(&data).await,
            GitHubOperation::CloseIssue => gh.close(&data).await,
            GitHubOperation::CreatePr => {
                let Some(branch) = non_empty_str(&data, "branch") else {
                    return Ok(error_result("Branch required to create a pull request"));
                };
                let title = non_empty_str(&data, "title").unwrap_or(branch);
                let body = data.get("body").and_then(Value::as_str).unwrap_or("");
                gh.create_pr(branch, title, body).await
            }
            GitHubOperation::RepositoryInsights => gh.insights().await,
        };

        match outcome {
            Ok(outcome) => outcome_result(&outcome),
            Err(e) => Ok(error_result(format!("GitHub operation {} failed: {}", name, e))),
        }
    }
}
