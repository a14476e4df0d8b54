//! GitHub integration through the `gh` CLI.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::integrations::{
    issue_number, joined_list, non_empty_str, IssueTracker, OperationOutcome,
};

/// Captured result of one `gh` invocation.
#[derive(Debug)]
struct CliOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// GitHub client that shells out to `gh`.
#[derive(Debug, Clone)]
pub struct GitHubCli {
    binary: String,
    token: Option<String>,
    repo: Option<String>,
    cli_available: bool,
}

impl GitHubCli {
    /// Probe `<binary> --version` and build a client.
    pub async fn detect(binary: impl Into<String>, token: Option<String>) -> Self {
        let binary = binary.into();
        let cli_available = match Command::new(&binary).arg("--version").output().await {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!("{} not available: {}", binary, e);
                false
            }
        };
        if !cli_available {
            warn!("GitHub CLI ({}) not found; github_advanced will report unavailable", binary);
        }
        Self {
            binary,
            token,
            repo: None,
            cli_available,
        }
    }

    /// Same client, scoped to `owner/name`.
    pub fn with_repo(&self, repo: Option<String>) -> Self {
        Self {
            repo: repo.filter(|r| !r.is_empty()),
            ..self.clone()
        }
    }

    /// Whether the `gh` binary answered the startup probe.
    pub fn cli_available(&self) -> bool {
        self.cli_available
    }

    async fn run(&self, mut args: Vec<String>) -> Result<CliOutput> {
        if let Some(repo) = &self.repo {
            args.push("--repo".to_string());
            args.push(repo.clone());
        }
        debug!("Running {} {}", self.binary, args.join(" "));

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args);
        if let Some(token) = &self.token {
            cmd.env("GH_TOKEN", token);
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::Command(format!("failed to run {}: {}", self.binary, e)))?;

        Ok(CliOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run a `--json` query and parse its stdout.
    async fn query_json(&self, args: Vec<String>) -> Result<Value> {
        let output = self.run(args).await?;
        if !output.success {
            return Err(Error::Command(output.stderr));
        }
        Ok(serde_json::from_str(&output.stdout)?)
    }

    /// Number of open issues or pull requests (`kind` is `issue` or `pr`).
    pub async fn count_open(&self, kind: &str) -> Option<usize> {
        let args = strings(&[kind, "list", "--state", "open", "--json", "number"]);
        match self.query_json(args).await {
            Ok(Value::Array(items)) => Some(items.len()),
            Ok(_) => None,
            Err(e) => {
                debug!("Could not count open {}s: {}", kind, e);
                None
            }
        }
    }

    /// Open a pull request from `branch`.
    pub async fn create_pr(
        &self,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<OperationOutcome> {
        if !self.cli_available {
            return Ok(OperationOutcome::failed("GitHub CLI not available"));
        }
        let args = strings(&["pr", "create", "--head", branch, "--title", title, "--body", body]);
        let output = self.run(args).await?;
        if output.success {
            Ok(OperationOutcome::succeeded(json!({
                "pr_url": output.stdout,
                "title": title,
            })))
        } else {
            Ok(OperationOutcome::failed(format!(
                "Failed to create PR: {}",
                output.stderr
            )))
        }
    }

    /// Repository metadata plus the five most recent issues and PRs.
    ///
    /// Sections that fail to load are left out rather than failing the call.
    pub async fn insights(&self) -> Result<OperationOutcome> {
        if !self.cli_available {
            return Ok(OperationOutcome::failed("GitHub CLI not available"));
        }

        let mut insights = Map::new();
        let mut view = strings(&["repo", "view"]);
        if let Some(repo) = &self.repo {
            view.push(repo.clone());
        }
        view.extend(strings(&[
            "--json",
            "name,description,stargazerCount,forkCount,issues,pullRequests",
        ]));
        // `repo view` takes the repository positionally, not via --repo.
        match self.without_repo().query_json(view).await {
            Ok(Value::Object(repo)) => insights.extend(repo),
            Ok(_) => {}
            Err(e) => debug!("repo view failed: {}", e),
        }

        for (key, kind) in [("recent_issues", "issue"), ("recent_prs", "pr")] {
            let args = strings(&[
                kind,
                "list",
                "--limit",
                "5",
                "--json",
                "number,title,createdAt,state",
            ]);
            match self.query_json(args).await {
                Ok(items) => {
                    insights.insert(key.to_string(), items);
                }
                Err(e) => debug!("{} list failed: {}", kind, e),
            }
        }

        Ok(OperationOutcome::succeeded(json!({ "insights": insights })))
    }

    fn without_repo(&self) -> Self {
        Self {
            repo: None,
            ..self.clone()
        }
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Arguments for `gh issue create`.
pub(crate) fn create_args(data: &Map<String, Value>) -> (String, Vec<String>) {
    let title = non_empty_str(data, "title").unwrap_or("Untitled Issue").to_string();
    let body = data.get("body").and_then(|v| v.as_str()).unwrap_or("");

    let mut args = strings(&["issue", "create", "--title", title.as_str(), "--body", body]);
    if let Some(labels) = joined_list(data, "labels") {
        args.extend(["--label".to_string(), labels]);
    }
    if let Some(assignees) = joined_list(data, "assignees") {
        args.extend(["--assignee".to_string(), assignees]);
    }
    if let Some(milestone) = non_empty_str(data, "milestone") {
        args.extend(["--milestone".to_string(), milestone.to_string()]);
    }
    (title, args)
}

/// Arguments for `gh issue edit`.
pub(crate) fn update_args(number: u64, data: &Map<String, Value>) -> Vec<String> {
    let mut args = vec!["issue".to_string(), "edit".to_string(), number.to_string()];
    if let Some(title) = data.get("title").and_then(|v| v.as_str()) {
        args.extend(["--title".to_string(), title.to_string()]);
    }
    if let Some(body) = data.get("body").and_then(|v| v.as_str()) {
        args.extend(["--body".to_string(), body.to_string()]);
    }
    if let Some(labels) = joined_list(data, "add_labels") {
        args.extend(["--add-label".to_string(), labels]);
    }
    if let Some(labels) = joined_list(data, "remove_labels") {
        args.extend(["--remove-label".to_string(), labels]);
    }
    args
}

/// Arguments for `gh issue close`.
pub(crate) fn close_args(number: u64, data: &Map<String, Value>) -> Vec<String> {
    let mut args = vec!["issue".to_string(), "close".to_string(), number.to_string()];
    if let Some(comment) = data.get("comment").and_then(|v| v.as_str()) {
        args.extend(["--comment".to_string(), comment.to_string()]);
    }
    args
}

#[async_trait]
impl IssueTracker for GitHubCli {
    fn display_name(&self) -> &str {
        "GitHub CLI"
    }

    fn is_configured(&self) -> bool {
        self.cli_available
    }

    fn status(&self) -> Value {
        json!({
            "configured": self.cli_available,
            "cli_available": self.cli_available,
            "token_set": self.token.is_some(),
        })
    }

    async fn create(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        let (title, args) = create_args(data);
        let output = self.run(args).await?;
        if output.success {
            Ok(OperationOutcome::succeeded(json!({
                "issue_url": output.stdout,
                "title": title,
            })))
        } else {
            Ok(OperationOutcome::failed(format!(
                "Failed to create issue: {}",
                output.stderr
            )))
        }
    }

    async fn update(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        let Some(number) = issue_number(data) else {
            return Ok(OperationOutcome::failed("Issue number required for update"));
        };
        let output = self.run(update_args(number, data)).await?;
        if output.success {
            Ok(OperationOutcome::message(format!("Updated issue #{}", number)))
        } else {
            Ok(OperationOutcome::failed(format!(
                "Failed to update issue: {}",
                output.stderr
            )))
        }
    }

    async fn close(&self, data: &Map<String, Value>) -> Result<OperationOutcome> {
        let Some(number) = issue_number(data) else {
            return Ok(OperationOutcome::failed("Issue number required to close"));
        };
        let output = self.run(close_args(number, data)).await?;
        if output.success {
            Ok(OperationOutcome::message(format!("Closed issue #{}", number)))
        } else {
            Ok(OperationOutcome::failed(format!(
                "Failed to close issue: {}",
                output.stderr
            )))
        }
    }

    async fn list(&self, filter: Option<&str>, limit: usize) -> Result<Vec<Value>> {
        let limit = limit.to_string();
        let mut args = strings(&[
            "issue",
            "list",
            "--state",
            "open",
            "--limit",
            limit.as_str(),
            "--json",
            "number,title,state,url",
        ]);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            args.extend(["--search".to_string(), filter.to_string()]);
        }
        match self.query_json(args).await? {
            Value::Array(items) => Ok(items),
            other => Err(Error::Command(format!("unexpected gh output: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_create_args_defaults() {
        let (title, args) = create_args(&Map::new());
        assert_eq!(title, "Untitled Issue");
        assert_eq!(args, strings(&["issue", "create", "--title", "Untitled Issue", "--body", ""]));
    }

    #[test]
    fn test_create_args_full() {
        let (title, args) = create_args(&data(json!({
            "title": "Crash on start",
            "body": "Steps...",
            "labels": ["bug", "p1"],
            "assignees": ["octocat"],
            "milestone": "v2"
        })));
        assert_eq!(title, "Crash on start");
        assert_eq!(
            args,
            strings(&[
                "issue", "create", "--title", "Crash on start", "--body", "Steps...",
                "--label", "bug,p1", "--assignee", "octocat", "--milestone", "v2",
            ])
        );
    }

    #[test]
    fn test_update_and_close_args() {
        let args = update_args(
            12,
            &data(json!({"title": "New", "add_labels": ["a"], "remove_labels": ["b", "c"]})),
        );
        assert_eq!(
            args,
            strings(&[
                "issue",
                "edit",
                "12",
                "--title",
                "New",
                "--add-label",
                "a",
                "--remove-label",
                "b,c",
            ])
        );

        let args = close_args(3, &data(json!({"comment": "fixed in #4"})));
        assert_eq!(args, strings(&["issue", "close", "3", "--comment", "fixed in #4"]));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unconfigured() {
        let gh = GitHubCli::detect("ccplugins-test-no-such-gh-binary", None).await;
        assert!(!gh.is_configured());
        assert_eq!(gh.status()["cli_available"], false);

        let outcome = gh.create_pr("feature", "Title", "").await.unwrap();
        assert_eq!(outcome.error(), Some("GitHub CLI not available"));
    }

    #[tokio::test]
    async fn test_missing_number_is_a_failed_outcome() {
        let gh = GitHubCli::detect("ccplugins-test-no-such-gh-binary", None).await;
        let outcome = gh.update(&Map::new()).await.unwrap();
        assert_eq!(outcome.error(), Some("Issue number required for update"));

        let outcome = gh.close(&Map::new()).await.unwrap();
        assert_eq!(outcome.error(), Some("Issue number required to close"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let gh = GitHubCli::detect("ccplugins-test-no-such-gh-binary", None).await;
        let err = gh.create(&Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::Command(_)));
    }

    #[test]
    fn test_with_repo_ignores_empty() {
        let gh = GitHubCli {
            binary: "gh".to_string(),
            token: None,
            repo: None,
            cli_available: true,
        };
        assert_eq!(gh.with_repo(Some(String::new())).repo, None);
        assert_eq!(gh.with_repo(Some("o/r".into())).repo.as_deref(), Some("o/r"));
    }
}
