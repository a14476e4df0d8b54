//! Service layer for the CCPlugins MCP server.
//!
//! Local, filesystem-backed collaborators used by the tools and resources,
//! plus [`Services`], the bundle of every collaborator built at startup.

pub mod analyzer;
pub mod scaffolder;

pub use analyzer::{analyze, ProjectContext};
pub use scaffolder::{ProjectScaffolder, ScaffoldResult, Template};

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::integrations::{GitHubCli, IssueTracker, JiraClient, LinearClient};

/// Every collaborator the tools and resources talk to.
#[derive(Clone)]
pub struct Services {
    pub workspace: PathBuf,
    pub scaffolder: Arc<ProjectScaffolder>,
    pub jira: Arc<JiraClient>,
    pub linear: Arc<LinearClient>,
    pub github: Arc<GitHubCli>,
}

impl Services {
    /// Build collaborators from configuration. Probes for the `gh` binary.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let jira = JiraClient::new(
            config.jira_url.clone(),
            config.jira_email.clone(),
            config.jira_api_token.clone(),
        )?;
        let linear = LinearClient::new(
            config.linear_api_token.clone(),
            config.linear_api_url.clone(),
        )?;
        let github =
            GitHubCli::detect(config.gh_binary.clone(), config.github_token.clone()).await;

        info!(
            "Collaborators: jira={}, linear={}, github={}",
            jira.is_configured(),
            linear.is_configured(),
            github.is_configured()
        );

        Ok(Self {
            workspace: config.workspace.clone(),
            scaffolder: Arc::new(ProjectScaffolder::new()),
            jira: Arc::new(jira),
            linear: Arc::new(linear),
            github: Arc::new(github),
        })
    }

    /// Issue trackers keyed by the name used in the tool-config resource.
    pub fn trackers(&self) -> Vec<(&'static str, Arc<dyn IssueTracker>)> {
        vec![
            ("jira", self.jira.clone() as Arc<dyn IssueTracker>),
            ("linear", self.linear.clone() as Arc<dyn IssueTracker>),
            ("github", self.github.clone() as Arc<dyn IssueTracker>),
        ]
    }
}
