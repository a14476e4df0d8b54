//! Jira Cloud integration (REST API v3).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::integrations::{non_empty_str, IssueTracker, OperationOutcome};
use crate::VERSION;

const DEFAULT_DESCRIPTION: &str = "Created via CCPlugins MCP integration";

/// Transition names treated as "closing" an issue, in preference order.
const CLOSING_TRANSITIONS: &[&str] = &["done", "closed", "resolved"];

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct ProjectPage {
    #[serde(default)]
    values: Vec<ProjectSummary>,
}

#[derive(Debug, Deserialize)]
struct ProjectSummary {
    key: String,
}

#[derive(Debug, Deserialize)]
struct Transitions {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Debug, Deserialize)]
struct Transition {
    id: String,
    name: String,
}

/// Jira REST client using basic auth (email + API token).
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: Client,
    base_url: Option<String>,
    email: Option<String>,
    api_token: Option<String>,
}

impl JiraClient {
    /// Create a client; missing credentials leave it unconfigured.
    pub fn new(
        base_url: Option<String>,
        email: Option<String>,
        api_token: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("ccplugins-mcp/{} (rust)", VERSION))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            email,
            api_token,
        })
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_default()
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url(), key)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/rest/api/3/{}", self.base_url(), path))
            .basic_auth(
                self.email.as_deref().unwrap_or_default(),
                self.api_token.as_deref(),
            )
            .header("Accept", "application/json")
    }

    /// Handle API response, extracting errors.
    async fn handle_response<R: serde::de::DeserializeOwned>(response: Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), status_text, body));
        }
        Ok(response.json().await?)
    }

    /// Key of the first visible project.
    async fn first_project(&self) -> Result<Option<String>> {
        let response = self
            .request(reqwest::Method::GET, "project/search")
            .send()
            .await?;
        let page: ProjectPage = Self::handle_response(response).await?;
        Ok(page.values.into_iter().next().map(|p| p.key))
    }

    async fn closing_transition(
        &self,
        key: &str,
        preferred: Option<&str>,
    ) -> Result<Option<Transition>> {
        let response = self
            .request(reqwest::Method::GET, &format!("issue/{}/transitions", key))
            .send()
            .await?;
        let Transitions { transitions } = Self::handle_response(response).await?;

        let wanted: Vec<String> = match preferred {
            Some(name) => vec![name.to_lowercase()],
            None => CLOSING_TRANSITIONS.iter().map(|s| s.to_string()).collect(),
        };
        for name in &wanted {
            if let Some(t) = transitions.iter().find(|t| t.name.to_lowercase() == *name) {
                return Ok(Some(Transition {
                    id: t.id.clone(),
                    name: t.name.clone(),
                }));
            }
        }
        Ok(None)
    }

    async fn failure_text(prefix: &str, response: Response) -> OperationOutcome {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        OperationOutcome::failed(format!("{}: {} - {}", prefix, status, body))
    }
}

/// Atlassian Document Format body with a single paragraph.
pub(crate) fn adf_document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }]
        }]
    })
}

/// Issue key from `key`, falling back to `number`.
fn issue_key(data: &Map<String, Value>) -> Option<String> {
    non_empty_str(data, "key")
        .map(String::from)
        .or_else(|| {
            data.get("number")
                .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
        })
}

#[async_trait]
impl IssueTracker for JiraClient {
    fn display_name(&self) -> &str {
        "Jira"
    }

    fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.email.is_some() && self.api_token.is_some()
    }

    fn status(&self) -> Value {
        json!({
            "configured": self.is_configured(),
            "url": self.base_url,
        })
    }

    async fn create(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        if !self.is_configured() {
            return Ok(OperationOutcome::failed(
                "Jira integration not configured. \
                 Set JIRA_URL, JIRA_EMAIL, and JIRA_API_TOKEN environment variables.",
            ));
        }

        let summary = non_empty_str(data, "summary")
            .or_else(|| non_empty_str(data, "title"))
            .unwrap_or("Untitled");
        let description = non_empty_str(data, "description").unwrap_or(DEFAULT_DESCRIPTION);
        let issue_type = non_empty_str(data, "issue_type").unwrap_or("Task");

        let project = match non_empty_str(data, "project") {
            Some(project) => project.to_string(),
            None => match self.first_project().await? {
                Some(project) => project,
                None => {
                    return Ok(OperationOutcome::failed(
                        "No projects found and no project specified",
                    ))
                }
            },
        };

        let payload = json!({
            "fields": {
                "project": { "key": project },
                "summary": summary,
                "description": adf_document(description),
                "issuetype": { "name": issue_type }
            }
        });
        debug!("Creating Jira issue in {}", project);

        let response = self
            .request(reqwest::Method::POST, "issue")
            .json(&payload)
            .send()
            .await?;
        if response.status() != StatusCode::CREATED {
            return Ok(Self::failure_text("Failed to create issue", response).await);
        }

        let created: CreatedIssue = response.json().await?;
        Ok(OperationOutcome::succeeded(json!({
            "issue": {
                "key": created.key,
                "url": self.browse_url(&created.key),
                "summary": summary,
            }
        })))
    }

    async fn update(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        let Some(key) = issue_key(data) else {
            return Ok(OperationOutcome::failed("Issue key required for update"));
        };

        let mut fields = Map::new();
        let summary = non_empty_str(data, "summary").or_else(|| non_empty_str(data, "title"));
        if let Some(summary) = summary {
            fields.insert("summary".to_string(), json!(summary));
        }
        if let Some(description) = non_empty_str(data, "description") {
            fields.insert("description".to_string(), adf_document(description));
        }
        if fields.is_empty() {
            return Ok(OperationOutcome::failed("Nothing to update"));
        }

        let response = self
            .request(reqwest::Method::PUT, &format!("issue/{}", key))
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(OperationOutcome::message(format!("Updated issue {}", key)))
        } else {
            Ok(Self::failure_text("Failed to update issue", response).await)
        }
    }

    async fn close(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        let Some(key) = issue_key(data) else {
            return Ok(OperationOutcome::failed("Issue key required to close"));
        };

        let Some(transition) = self
            .closing_transition(&key, non_empty_str(data, "transition"))
            .await?
        else {
            return Ok(OperationOutcome::failed(format!(
                "No closing transition available for {}",
                key
            )));
        };

        let response = self
            .request(reqwest::Method::POST, &format!("issue/{}/transitions", key))
            .json(&json!({ "transition": { "id": transition.id } }))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(OperationOutcome::message(format!(
                "Closed issue {} ({})",
                key, transition.name
            )))
        } else {
            Ok(Self::failure_text("Failed to close issue", response).await)
        }
    }

    async fn list(&self, filter: Option<&str>, limit: usize) -> Result<Vec<Value>> {
        if !self.is_configured() {
            return Ok(Vec::new());
        }

        let jql = filter.filter(|f| !f.is_empty()).unwrap_or("order by created DESC");
        let response = self
            .request(reqwest::Method::GET, "search")
            .query(&[
                ("jql", jql),
                ("maxResults", &limit.to_string()),
                ("fields", "summary,status,assignee,created,updated"),
            ])
            .send()
            .await?;
        let body: Value = Self::handle_response(response).await?;

        let issues = body["issues"].as_array().cloned().unwrap_or_default();
        Ok(issues
            .iter()
            .filter_map(|issue| {
                let key = issue["key"].as_str()?;
                Some(json!({
                    "key": key,
                    "summary": issue["fields"]["summary"],
                    "status": issue["fields"]["status"]["name"],
                    "url": self.browse_url(key),
                }))
            })
            .collect())
    }
}
