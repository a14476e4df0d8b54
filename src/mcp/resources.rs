//! MCP Resources Support
//!
//! Read-only JSON documents describing the workspace, the scaffolder catalog
//! and the collaborator configuration.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::integrations::IssueTracker;
use crate::service::{analyze, ProjectScaffolder, Services};

pub const PROJECT_CONTEXT_URI: &str = "ccplugins://project/context";
pub const TEMPLATES_URI: &str = "ccplugins://templates/list";
pub const TOOL_CONFIG_URI: &str = "ccplugins://tools/config";

const JSON_MIME: &str = "application/json";

/// A resource exposed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Resource contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// Produces the body of one resource.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    fn descriptor(&self) -> Resource;

    async fn read(&self) -> Result<String>;
}

/// Resource registry, in registration order.
#[derive(Default)]
pub struct ResourceRegistry {
    readers: Vec<Arc<dyn ResourceReader>>,
    index: HashMap<String, usize>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three built-in resources.
    pub fn builtin(services: &Services) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(ProjectContextResource {
            workspace: services.workspace.clone(),
        })?;
        registry.register(TemplatesResource {
            scaffolder: services.scaffolder.clone(),
        })?;
        registry.register(ToolConfigResource {
            trackers: services.trackers(),
        })?;
        Ok(registry)
    }

    /// Register a reader. URIs are unique.
    pub fn register<R: ResourceReader + 'static>(&mut self, reader: R) -> Result<()> {
        let uri = reader.descriptor().uri;
        if self.index.contains_key(&uri) {
            return Err(Error::DuplicateCapability(format!("resource {}", uri)));
        }
        self.index.insert(uri, self.readers.len());
        self.readers.push(Arc::new(reader));
        Ok(())
    }

    pub fn list(&self) -> ListResourcesResult {
        ListResourcesResult {
            resources: self.readers.iter().map(|r| r.descriptor()).collect(),
        }
    }

    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        let reader = self
            .index
            .get(uri)
            .map(|&i| self.readers[i].clone())
            .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;

        let descriptor = reader.descriptor();
        let text = reader.read().await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: descriptor.uri,
                mime_type: descriptor.mime_type,
                text,
            }],
        })
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

fn json_resource(uri: &str, name: &str, description: &str) -> Resource {
    Resource {
        uri: uri.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        mime_type: JSON_MIME.to_string(),
    }
}

/// Analysis of the configured workspace.
struct ProjectContextResource {
    workspace: PathBuf,
}

#[async_trait]
impl ResourceReader for ProjectContextResource {
    fn descriptor(&self) -> Resource {
        json_resource(
            PROJECT_CONTEXT_URI,
            "Project Context",
            "Current project context and analysis",
        )
    }

    async fn read(&self) -> Result<String> {
        let workspace = self.workspace.clone();
        let context = tokio::task::spawn_blocking(move || analyze(&workspace))
            .await
            .map_err(|e| Error::Internal(format!("Project analysis task failed: {}", e)))??;

        let mut body = match serde_json::to_value(&context)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("generated_at".to_string(), json!(Utc::now().to_rfc3339()));
        Ok(serde_json::to_string_pretty(&body)?)
    }
}

/// The scaffolder catalog.
struct TemplatesResource {
    scaffolder: Arc<ProjectScaffolder>,
}

#[async_trait]
impl ResourceReader for TemplatesResource {
    fn descriptor(&self) -> Resource {
        json_resource(
            TEMPLATES_URI,
            "Available Templates",
            "Project templates and scaffolding options",
        )
    }

    async fn read(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self.scaffolder.templates())?)
    }
}

/// Configured/unconfigured status of each tracker.
struct ToolConfigResource {
    trackers: Vec<(&'static str, Arc<dyn IssueTracker>)>,
}

#[async_trait]
impl ResourceReader for ToolConfigResource {
    fn descriptor(&self) -> Resource {
        json_resource(
            TOOL_CONFIG_URI,
            "Tool Configurations",
            "External tool integration settings",
        )
    }

    async fn read(&self) -> Result<String> {
        let status: Map<String, Value> = self
            .trackers
            .iter()
            .map(|(name, tracker)| (name.to_string(), tracker.status()))
            .collect();
        Ok(serde_json::to_string_pretty(&status)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    async fn services(workspace: &std::path::Path) -> Services {
        let config = Config {
            workspace: workspace.to_path_buf(),
            gh_binary: "ccplugins-test-no-such-gh-binary".to_string(),
            ..Config::default()
        };
        Services::from_config(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_list_resources_in_order() {
        let dir = TempDir::new().unwrap();
        let registry = ResourceRegistry::builtin(&services(dir.path()).await).unwrap();

        let uris: Vec<String> = registry.list().resources.into_iter().map(|r| r.uri).collect();
        assert_eq!(uris, vec![PROJECT_CONTEXT_URI, TEMPLATES_URI, TOOL_CONFIG_URI]);

        let json = serde_json::to_value(registry.list()).unwrap();
        assert_eq!(json["resources"][0]["mimeType"], "application/json");
        assert_eq!(json["resources"][0]["name"], "Project Context");
    }

    #[tokio::test]
    async fn test_read_project_context_missing_workspace() {
        let dir = TempDir::new().unwrap();
        let registry =
            ResourceRegistry::builtin(&services(&dir.path().join("no/such/workspace")).await)
                .unwrap();

        let err = registry.read(PROJECT_CONTEXT_URI).await.unwrap_err();
        assert_eq!(err.code(), crate::mcp::protocol::error_codes::INTERNAL_ERROR);
        assert!(err.client_message().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_read_project_context() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        let registry = ResourceRegistry::builtin(&services(dir.path()).await).unwrap();

        let result = registry.read(PROJECT_CONTEXT_URI).await.unwrap();
        assert_eq!(result.contents.len(), 1);
        assert_eq!(result.contents[0].uri, PROJECT_CONTEXT_URI);

        let body: Value = serde_json::from_str(&result.contents[0].text).unwrap();
        assert_eq!(body["language"], "python");
        assert!(body["generated_at"].is_string());
    }

    #[tokio::test]
    async fn test_read_templates() {
        let dir = TempDir::new().unwrap();
        let registry = ResourceRegistry::builtin(&services(dir.path()).await).unwrap();

        let result = registry.read(TEMPLATES_URI).await.unwrap();
        let body: Value = serde_json::from_str(&result.contents[0].text).unwrap();
        assert_eq!(body[0]["name"], "python-cli");
        assert_eq!(body[3]["name"], "claude-plugin");
        assert!(body[0].get("files").is_none());
    }

    #[tokio::test]
    async fn test_tool_config_never_leaks_secrets() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            workspace: dir.path().to_path_buf(),
            linear_api_token: Some("lin_api_secret".to_string()),
            gh_binary: "ccplugins-test-no-such-gh-binary".to_string(),
            ..Config::default()
        };
        let services = Services::from_config(&config).await.unwrap();
        let registry = ResourceRegistry::builtin(&services).unwrap();

        let result = registry.read(TOOL_CONFIG_URI).await.unwrap();
        let text = &result.contents[0].text;
        assert!(!text.contains("lin_api_secret"));

        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["linear"]["configured"], true);
        assert_eq!(body["jira"]["configured"], false);
        assert_eq!(body["github"]["cli_available"], false);
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let dir = TempDir::new().unwrap();
        let registry = ResourceRegistry::builtin(&services(dir.path()).await).unwrap();

        let err = registry.read("ccplugins://nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource: ccplugins://nope");
        assert_eq!(err.code(), -32602);
    }

    #[tokio::test]
    async fn test_duplicate_uri_rejected() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(TemplatesResource {
                scaffolder: Arc::new(ProjectScaffolder::new()),
            })
            .unwrap();
        let err = registry
            .register(TemplatesResource {
                scaffolder: Arc::new(ProjectScaffolder::new()),
            })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCapability(_)));
        assert_eq!(registry.len(), 1);
    }
}
