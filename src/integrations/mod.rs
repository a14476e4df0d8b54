//! External issue trackers.
//!
//! Every tracker sits behind [`IssueTracker`]. HTTP and CLI mechanics,
//! credentials and field mapping stay inside the implementations; callers only
//! see [`OperationOutcome`]s and item summaries.
//!
//! - `github` - GitHub via the `gh` CLI
//! - `jira` - Jira Cloud REST v3
//! - `linear` - Linear GraphQL API

pub mod github;
pub mod jira;
pub mod linear;

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Map, Value};

use crate::error::Result;

pub use github::GitHubCli;
pub use jira::JiraClient;
pub use linear::LinearClient;

/// Outcome of one tracker operation.
///
/// Serializes as `{"success": true, ...payload}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Succeeded(Map<String, Value>),
    Failed(String),
}

impl OperationOutcome {
    /// Successful outcome from a JSON object; non-objects land under `value`.
    pub fn succeeded(payload: Value) -> Self {
        match payload {
            Value::Object(map) => Self::Succeeded(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Self::Succeeded(map)
            }
        }
    }

    /// Successful outcome carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::succeeded(json!({ "message": message.into() }))
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// The error message, for failed outcomes.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(error) => Some(error),
        }
    }

    /// A payload field, for successful outcomes.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Succeeded(payload) => payload.get(key),
            Self::Failed(_) => None,
        }
    }
}

impl Serialize for OperationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Succeeded(payload) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("success", &true)?;
                for (key, value) in payload {
                    if key != "success" {
                        map.serialize_entry(key, value)?;
                    }
                }
                map.end()
            }
            Self::Failed(error) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Narrow interface to an issue tracker.
///
/// `Ok(OperationOutcome::Failed(..))` is an expected, tracker-reported
/// failure; `Err` is a fault (spawn failure, transport error, bad payload).
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Human-readable name used in availability messages.
    fn display_name(&self) -> &str;

    /// Whether credentials / tooling are present.
    fn is_configured(&self) -> bool;

    /// Configuration summary for the tool-config resource. Never includes secrets.
    fn status(&self) -> Value {
        json!({ "configured": self.is_configured() })
    }

    async fn create(&self, data: &Map<String, Value>) -> Result<OperationOutcome>;

    async fn update(&self, data: &Map<String, Value>) -> Result<OperationOutcome>;

    async fn close(&self, data: &Map<String, Value>) -> Result<OperationOutcome>;

    async fn list(&self, filter: Option<&str>, limit: usize) -> Result<Vec<Value>>;
}

/// Join a string-array field with commas; `None` when absent or empty.
pub(crate) fn joined_list(data: &Map<String, Value>, key: &str) -> Option<String> {
    let items: Vec<&str> = data
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join(","))
    }
}

/// Read a string field, treating empty strings as absent.
pub(crate) fn non_empty_str<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Issue number from either a JSON number or a numeric string.
pub(crate) fn issue_number(data: &Map<String, Value>) -> Option<u64> {
    match data.get("number")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}
