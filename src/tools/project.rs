//! Project tools: scaffolding and context analysis.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::handler::{
    error_result, get_object_arg, get_optional_string_arg, get_string_arg, success_result,
    ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::service::{analyze, ProjectScaffolder};

/// Resolve a caller-supplied path against the workspace.
fn resolve(workspace: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Project scaffold tool.
pub struct ProjectScaffoldTool {
    scaffolder: Arc<ProjectScaffolder>,
    workspace: PathBuf,
}

impl ProjectScaffoldTool {
    pub fn new(scaffolder: Arc<ProjectScaffolder>, workspace: PathBuf) -> Self {
        Self {
            scaffolder,
            workspace,
        }
    }
}

#[async_trait]
impl ToolHandler for ProjectScaffoldTool {
    fn definition(&self) -> Tool {
        let templates: Vec<&str> = self.scaffolder.templates().iter().map(|t| t.name).collect();
        Tool {
            name: "project_scaffold".to_string(),
            description: "Generate project structure from templates".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "template": {
                        "type": "string",
                        "enum": templates,
                        "description": "Template name"
                    },
                    "name": {"type": "string", "description": "Project name"},
                    "options": {
                        "type": "object",
                        "description": "Template variables, overriding defaults"
                    },
                    "target_dir": {
                        "type": "string",
                        "description": "Parent directory (default: workspace)"
                    }
                },
                "required": ["template", "name"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let template = get_string_arg(&args, "template")?;
        let name = get_string_arg(&args, "name")?;
        let options = get_object_arg(&args, "options");
        let target_dir = get_optional_string_arg(&args, "target_dir")
            .map(|dir| resolve(&self.workspace, &dir))
            .unwrap_or_else(|| self.workspace.clone());

        match self
            .scaffolder
            .scaffold(&template, &name, &target_dir, &options)
            .await
        {
            Ok(result) => {
                let mut body = serde_json::to_value(&result)?;
                body["success"] = json!(true);
                Ok(success_result(serde_json::to_string_pretty(&body)?))
            }
            Err(Error::Scaffold(msg)) => Ok(error_result(msg)),
            Err(e) => Ok(error_result(format!("Error scaffolding project: {}", e))),
        }
    }
}

/// Context analyze tool.
pub struct ContextAnalyzeTool {
    workspace: PathBuf,
}

impl ContextAnalyzeTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolHandler for ContextAnalyzeTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "context_analyze".to_string(),
            description: "Analyze project context and provide recommendations".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Project path to analyze"},
                    "analysis_type": {
                        "type": "string",
                        "description": "Type of analysis (default: general)"
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let path = resolve(&self.workspace, &get_string_arg(&args, "path")?);
        let analysis_type = get_optional_string_arg(&args, "analysis_type")
            .unwrap_or_else(|| "general".to_string());

        let target = path.clone();
        let context = tokio::task::spawn_blocking(move || analyze(&target))
            .await
            .map_err(|e| Error::Internal(format!("Project analysis task failed: {}", e)))?;

        match context {
            Ok(context) => {
                let mut body = serde_json::to_value(&context)?;
                body["analysis_type"] = json!(analysis_type);
                Ok(success_result(format!(
                    "Project analysis complete for {}: {}",
                    path.display(),
                    serde_json::to_string_pretty(&body)?
                )))
            }
            Err(e) => Ok(error_result(e.to_string())),
        }
    }
}
