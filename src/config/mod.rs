//! Configuration management for the CCPlugins MCP server.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::integrations::linear::DEFAULT_API_URL as DEFAULT_LINEAR_API_URL;

/// Command-line arguments for the CCPlugins MCP server.
#[derive(Parser, Debug, Clone)]
#[command(name = "ccplugins-mcp")]
#[command(author = "CCPlugins Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing issue trackers, project scaffolding and context analysis")]
pub struct Args {
    /// Workspace root directory
    #[arg(short, long, env = "CCPLUGINS_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "CCPLUGINS_DEBUG")]
    pub debug: bool,

    /// Also write logs to this file (stderr is always used)
    #[arg(long, env = "CCPLUGINS_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Jira base URL, e.g. https://team.atlassian.net
    #[arg(long, env = "JIRA_URL")]
    pub jira_url: Option<String>,

    /// Jira account email
    #[arg(long, env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    /// Jira API token
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub jira_api_token: Option<String>,

    /// Linear API token
    #[arg(long, env = "LINEAR_API_TOKEN", hide_env_values = true)]
    pub linear_api_token: Option<String>,

    /// Linear GraphQL endpoint
    #[arg(long, default_value = DEFAULT_LINEAR_API_URL)]
    pub linear_api_url: String,

    /// GitHub token handed to the gh CLI as GH_TOKEN
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Path or name of the GitHub CLI binary
    #[arg(long, default_value = "gh", env = "CCPLUGINS_GH_BINARY")]
    pub gh_binary: String,
}

/// Server configuration.
///
/// Secrets are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace root directory
    pub workspace: PathBuf,
    /// Debug mode
    pub debug: bool,
    /// Extra log sink
    pub log_file: Option<PathBuf>,
    pub jira_url: Option<String>,
    pub jira_email: Option<String>,
    #[serde(skip_serializing, default)]
    pub jira_api_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub linear_api_token: Option<String>,
    pub linear_api_url: String,
    #[serde(skip_serializing, default)]
    pub github_token: Option<String>,
    pub gh_binary: String,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Treat empty environment values as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            workspace: args.workspace.unwrap_or_else(current_dir),
            debug: args.debug,
            log_file: args.log_file,
            jira_url: non_empty(args.jira_url),
            jira_email: non_empty(args.jira_email),
            jira_api_token: non_empty(args.jira_api_token),
            linear_api_token: non_empty(args.linear_api_token),
            linear_api_url: args.linear_api_url,
            github_token: non_empty(args.github_token),
            gh_binary: args.gh_binary,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: current_dir(),
            debug: false,
            log_file: None,
            jira_url: None,
            jira_email: None,
            jira_api_token: None,
            linear_api_token: None,
            linear_api_url: DEFAULT_LINEAR_API_URL.to_string(),
            github_token: None,
            gh_binary: "gh".to_string(),
        }
    }
}
