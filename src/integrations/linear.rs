//! Linear integration over the GraphQL API.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::integrations::{non_empty_str, IssueTracker, OperationOutcome};
use crate::VERSION;

pub const DEFAULT_API_URL: &str = "https://api.linear.app/graphql";

const DEFAULT_DESCRIPTION: &str = "Created via CCPlugins MCP integration";
const DEFAULT_PRIORITY: i64 = 2;

const ISSUE_CREATE: &str = r#"
mutation IssueCreate($input: IssueCreateInput!) {
    issueCreate(input: $input) {
        success
        issue { id identifier title url }
    }
}"#;

const ISSUE_UPDATE: &str = r#"
mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) {
    issueUpdate(id: $id, input: $input) {
        success
        issue { id identifier title url state { name } }
    }
}"#;

const TEAMS: &str = r#"
query Teams {
    teams { nodes { id name key } }
}"#;

const TEAM_STATES: &str = r#"
query WorkflowStates($teamId: String!) {
    team(id: $teamId) {
        states { nodes { id name type } }
    }
}"#;

const ISSUES: &str = r#"
query Issues($first: Int!, $filter: IssueFilter) {
    issues(first: $first, filter: $filter) {
        nodes {
            id identifier title url createdAt
            state { name }
            assignee { name }
        }
    }
}"#;

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TeamsData {
    teams: Nodes<Team>,
}

#[derive(Debug, Deserialize)]
struct Team {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TeamStatesData {
    team: Option<TeamStates>,
}

#[derive(Debug, Deserialize)]
struct TeamStates {
    states: Nodes<WorkflowState>,
}

#[derive(Debug, Deserialize)]
struct WorkflowState {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueCreateData {
    issue_create: Mutation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueUpdateData {
    issue_update: Mutation,
}

#[derive(Debug, Deserialize)]
struct Mutation {
    success: bool,
    issue: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: Nodes<Value>,
}

/// Linear GraphQL client using a personal API token.
#[derive(Debug, Clone)]
pub struct LinearClient {
    client: Client,
    api_url: String,
    api_token: Option<String>,
}

impl LinearClient {
    pub fn new(api_token: Option<String>, api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("ccplugins-mcp/{} (rust)", VERSION))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_token,
        })
    }

    /// Run a GraphQL document and decode its `data`.
    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_token.as_deref().unwrap_or_default())
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), status_text, body));
        }

        let body: GraphQlResponse<T> = response.json().await?;
        if let Some(first) = body.errors.first() {
            return Err(Error::api(200, "GraphQL error", first.message.clone()));
        }
        body.data
            .ok_or_else(|| Error::Internal("Linear returned no data".to_string()))
    }

    async fn first_team(&self) -> Result<Option<String>> {
        let data: TeamsData = self.query(TEAMS, json!({})).await?;
        Ok(data.teams.nodes.into_iter().next().map(|t| t.id))
    }

    /// Id of the first state of type `completed` for a team.
    async fn completed_state(&self, team_id: &str) -> Result<Option<String>> {
        let data: TeamStatesData = self
            .query(TEAM_STATES, json!({ "teamId": team_id }))
            .await?;
        Ok(data
            .team
            .into_iter()
            .flat_map(|t| t.states.nodes)
            .find(|s| s.kind == "completed")
            .map(|s| s.id))
    }

    async fn issue_update(&self, id: &str, input: Map<String, Value>) -> Result<Mutation> {
        let data: IssueUpdateData = self
            .query(ISSUE_UPDATE, json!({ "id": id, "input": input }))
            .await?;
        Ok(data.issue_update)
    }
}

/// Update input from the editable fields present in `data`.
fn update_input(data: &Map<String, Value>) -> Map<String, Value> {
    let mut input = Map::new();
    for key in ["title", "description"] {
        if let Some(value) = non_empty_str(data, key) {
            input.insert(key.to_string(), json!(value));
        }
    }
    if let Some(priority) = data.get("priority").and_then(Value::as_i64) {
        input.insert("priority".to_string(), json!(priority));
    }
    input
}

fn issue_id(data: &Map<String, Value>) -> Option<&str> {
    non_empty_str(data, "id").or_else(|| non_empty_str(data, "identifier"))
}

#[async_trait]
impl IssueTracker for LinearClient {
    fn display_name(&self) -> &str {
        "Linear"
    }

    fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    fn status(&self) -> Value {
        json!({
            "configured": self.is_configured(),
            "api_url": self.api_url,
        })
    }

    async fn create(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        if !self.is_configured() {
            return Ok(OperationOutcome::failed(
                "Linear integration not configured. Set LINEAR_API_TOKEN environment variable.",
            ));
        }

        let title = non_empty_str(data, "title").unwrap_or("Untitled");
        let team_id = match non_empty_str(data, "team_id") {
            Some(team) => team.to_string(),
            None => match self.first_team().await? {
                Some(team) => team,
                None => {
                    return Ok(OperationOutcome::failed(
                        "No teams found and no team specified",
                    ))
                }
            },
        };

        let input = json!({
            "title": title,
            "description": non_empty_str(data, "description").unwrap_or(DEFAULT_DESCRIPTION),
            "teamId": team_id,
            "priority": data.get("priority").and_then(Value::as_i64).unwrap_or(DEFAULT_PRIORITY),
        });
        debug!("Creating Linear issue for team {}", team_id);

        let created: IssueCreateData = self.query(ISSUE_CREATE, json!({ "input": input })).await?;
        match created.issue_create {
            Mutation {
                success: true,
                issue: Some(issue),
            } => Ok(OperationOutcome::succeeded(json!({
                "issue": {
                    "id": issue["id"],
                    "identifier": issue["identifier"],
                    "title": issue["title"],
                    "url": issue["url"],
                }
            }))),
            _ => Ok(OperationOutcome::failed("Failed to create issue in Linear")),
        }
    }

    async fn update(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        let Some(id) = issue_id(data) else {
            return Ok(OperationOutcome::failed("Issue id required for update"));
        };
        let input = update_input(data);
        if input.is_empty() {
            return Ok(OperationOutcome::failed("Nothing to update"));
        }

        let result = self.issue_update(id, input).await?;
        if result.success {
            Ok(OperationOutcome::message(format!("Updated issue {}", id)))
        } else {
            Ok(OperationOutcome::failed(format!("Failed to update issue {}", id)))
        }
    }

    async fn close(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        let Some(id) = issue_id(data) else {
            return Ok(OperationOutcome::failed("Issue id required to close"));
        };

        let state_id = match (non_empty_str(data, "state_id"), non_empty_str(data, "team_id")) {
            (Some(state), _) => Some(state.to_string()),
            (None, Some(team)) => self.completed_state(team).await?,
            (None, None) => None,
        };
        let Some(state_id) = state_id else {
            return Ok(OperationOutcome::failed(
                "Closing a Linear issue needs state_id or team_id",
            ));
        };

        let mut input = Map::new();
        input.insert("stateId".to_string(), json!(state_id));
        let result = self.issue_update(id, input).await?;
        if result.success {
            Ok(OperationOutcome::message(format!("Closed issue {}", id)))
        } else {
            Ok(OperationOutcome::failed(format!("Failed to close issue {}", id)))
        }
    }

    async fn list(&self, filter: Option<&str>, limit: usize) -> Result<Vec<Value>> {
        if !self.is_configured() {
            return Ok(Vec::new());
        }

        let team_filter = filter
            .filter(|team| !team.is_empty())
            .map(|team| json!({ "team": { "id": { "eq": team } } }));
        let data: IssuesData = self
            .query(ISSUES, json!({ "first": limit, "filter": team_filter }))
            .await?;

        Ok(data
            .issues
            .nodes
            .into_iter()
            .map(|issue| {
                json!({
                    "id": issue["id"],
                    "identifier": issue["identifier"],
                    "title": issue["title"],
                    "state": issue["state"]["name"],
                    "assignee": issue["assignee"]["name"].as_str().unwrap_or("Unassigned"),
                    "url": issue["url"],
                    "created": issue["createdAt"],
                })
            })
            .collect())
    }
}
