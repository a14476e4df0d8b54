//! Issue creation tools for Jira and Linear.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::integrations::{IssueTracker, JiraClient, LinearClient};
use crate::mcp::handler::{
    error_result, get_optional_int_arg, get_optional_string_arg, get_string_arg, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::tools::outcome_result;

/// Create Jira issue tool.
pub struct JiraCreateIssueTool {
    jira: Arc<JiraClient>,
}

impl JiraCreateIssueTool {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl ToolHandler for JiraCreateIssueTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "jira_create_issue".to_string(),
            description: "Create a new issue in Jira".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string", "description": "Issue summary"},
                    "description": {"type": "string", "description": "Issue description"},
                    "project": {"type": "string", "description": "Project key"},
                    "issue_type": {
                        "type": "string",
                        "description": "Issue type (Bug, Task, Story)"
                    }
                },
                "required": ["summary", "project"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let summary = get_string_arg(&args, "summary")?;
        let project = get_string_arg(&args, "project")?;

        let mut data = Map::new();
        data.insert("summary".to_string(), json!(summary));
        data.insert("project".to_string(), json!(project));
        for key in ["description", "issue_type"] {
            if let Some(value) = get_optional_string_arg(&args, key) {
                data.insert(key.to_string(), json!(value));
            }
        }

        match self.jira.create(&data).await {
            Ok(outcome) => outcome_result(&outcome),
            Err(e) => Ok(error_result(format!("Failed to create Jira issue: {}", e))),
        }
    }
}

/// Create Linear issue tool.
pub struct LinearCreateIssueTool {
    linear: Arc<LinearClient>,
}

impl LinearCreateIssueTool {
    pub fn new(linear: Arc<LinearClient>) -> Self {
        Self { linear }
    }
}

#[async_trait]
impl ToolHandler for LinearCreateIssueTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "linear_create_issue".to_string(),
            description: "Create a new issue in Linear".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Issue title"},
                    "description": {"type": "string", "description": "Issue description"},
                    "team_id": {"type": "string", "description": "Team ID"},
                    "priority": {"type": "integer", "description": "Priority (0-4)"}
                },
                "required": ["title", "team_id"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let title = get_string_arg(&args, "title")?;
        let team_id = get_string_arg(&args, "team_id")?;

        let mut data = Map::new();
        data.insert("title".to_string(), json!(title));
        data.insert("team_id".to_string(), json!(team_id));
        if let Some(description) = get_optional_string_arg(&args, "description") {
            data.insert("description".to_string(), json!(description));
        }
        if let Some(priority) = get_optional_int_arg(&args, "priority") {
            data.insert("priority".to_string(), json!(priority));
        }

        match self.linear.create(&data).await {
            Ok(outcome) => outcome_result(&outcome),
            Err(e) => Ok(error_result(format!("Failed to create Linear issue: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::linear::DEFAULT_API_URL;

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_jira_unconfigured_is_tool_error() {
        let tool = JiraCreateIssueTool::new(Arc::new(JiraClient::new(None, None, None).unwrap()));
        let result = tool
            .execute(args(json!({"summary": "Broken build", "project": "ENG"})))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.text().contains("JIRA_URL"));
    }

    #[tokio::test]
    async fn test_jira_missing_summary_is_invalid_params() {
        let tool = JiraCreateIssueTool::new(Arc::new(JiraClient::new(None, None, None).unwrap()));
        let err = tool.execute(args(json!({"project": "ENG"}))).await.unwrap_err();
        assert_eq!(err.code(), -32602);
        assert!(err.to_string().contains("summary"));
    }

    #[tokio::test]
    async fn test_linear_unconfigured_is_tool_error() {
        let tool =
            LinearCreateIssueTool::new(Arc::new(LinearClient::new(None, DEFAULT_API_URL).unwrap()));
        let result = tool
            .execute(args(json!({"title": "Flaky test", "team_id": "t1", "priority": 1})))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.text().contains("LINEAR_API_TOKEN"));
    }

    #[test]
    fn test_definitions() {
        let jira = JiraCreateIssueTool::new(Arc::new(JiraClient::new(None, None, None).unwrap()));
        assert_eq!(jira.definition().name, "jira_create_issue");
        assert_eq!(
            jira.definition().input_schema["required"],
            json!(["summary", "project"])
        );
    }
}
