//! MCP Server Integration Tests
//!
//! These tests spawn the server binary, feed it newline-delimited JSON-RPC
//! on stdin and check the responses it writes to stdout.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const BIN: &str = "ccplugins-mcp";

/// Server command with no tracker credentials and no usable gh binary.
fn server_command(workspace: &TempDir) -> AssertCommand {
    let mut cmd = AssertCommand::cargo_bin(BIN).unwrap();
    cmd.arg("--workspace")
        .arg(workspace.path())
        .env("CCPLUGINS_GH_BINARY", "ccplugins-test-no-such-gh-binary")
        .env_remove("JIRA_URL")
        .env_remove("JIRA_EMAIL")
        .env_remove("JIRA_API_TOKEN")
        .env_remove("LINEAR_API_TOKEN")
        .env_remove("GITHUB_TOKEN");
    cmd
}

/// Run one session: every input line in, every response line out.
fn session(workspace: &TempDir, lines: &[String]) -> Vec<Value> {
    let mut input = lines.join("\n");
    input.push('\n');

    let output = server_command(workspace).write_stdin(input).output().unwrap();
    assert!(output.status.success(), "server exited with {:?}", output.status);

    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn request(id: Value, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

fn create_test_workspace() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(
        dir.path().join("Cargo.toml"),
        "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n",
    )
    .expect("Failed to write Cargo.toml");
    std::fs::create_dir(dir.path().join("src")).expect("Failed to create src");
    std::fs::write(dir.path().join("src/main.rs"), "fn main() {}\n")
        .expect("Failed to write main.rs");
    dir
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_binary_help() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--workspace"))
        .stdout(predicate::str::contains("--jira-url"));
}

#[test]
fn test_binary_version() {
    AssertCommand::cargo_bin(BIN)
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ccplugins-mcp"));
}

#[test]
fn test_empty_input_exits_cleanly() {
    let workspace = create_test_workspace();
    server_command(&workspace)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_mcp_initialize() {
    let workspace = create_test_workspace();
    let responses = session(
        &workspace,
        &[request(
            json!(1),
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            }),
        )],
    );

    assert_eq!(responses.len(), 1);
    let result = &responses[0]["result"];
    assert_eq!(result["serverInfo"]["name"], "ccplugins-mcp-server");
    assert!(result.get("protocolVersion").is_some());
    assert!(result["capabilities"].get("tools").is_some());
    assert!(result["capabilities"].get("resources").is_some());
    assert!(result["capabilities"].get("prompts").is_some());
}

#[test]
fn test_mcp_list_tools_in_catalog_order() {
    let workspace = create_test_workspace();
    let responses = session(&workspace, &[request(json!("1"), "tools/list", json!({}))]);

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], "1");
    let names: Vec<&str> = responses[0]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "jira_create_issue",
            "linear_create_issue",
            "github_advanced",
            "project_scaffold",
            "context_analyze"
        ]
    );
}

#[test]
fn test_mcp_unknown_tool_and_method() {
    let workspace = create_test_workspace();
    let responses = session(
        &workspace,
        &[
            request(json!(2), "tools/call", json!({"name": "does_not_exist", "arguments": {}})),
            request(json!(3), "tools/frobnicate", json!({})),
        ],
    );

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 2);
    assert_eq!(responses[0]["error"]["code"], -32602);
    assert_eq!(responses[0]["error"]["message"], "Unknown tool: does_not_exist");
    assert_eq!(responses[1]["id"], 3);
    assert_eq!(responses[1]["error"]["code"], -32601);
}

#[test]
fn test_mcp_malformed_line_does_not_stop_the_server() {
    let workspace = create_test_workspace();
    let responses = session(
        &workspace,
        &[
            "{not json".to_string(),
            String::new(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            request(json!(4), "prompts/list", json!({})),
        ],
    );

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32603);
    assert_eq!(responses[1]["id"], 4);
    let prompts: Vec<&str> = responses[1]["result"]["prompts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(prompts, vec!["create_command", "optimize_workflow"]);
}

#[test]
fn test_mcp_list_resources() {
    let workspace = create_test_workspace();
    let responses = session(&workspace, &[request(json!(5), "resources/list", json!({}))]);

    let uris: Vec<&str> = responses[0]["result"]["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap())
        .collect();
    assert_eq!(
        uris,
        vec![
            "ccplugins://project/context",
            "ccplugins://templates/list",
            "ccplugins://tools/config"
        ]
    );
}

#[test]
fn test_mcp_read_project_context() {
    let workspace = create_test_workspace();
    let responses = session(
        &workspace,
        &[
            request(json!(6), "resources/read", json!({"uri": "ccplugins://project/context"})),
            request(json!(7), "resources/read", json!({"uri": "ccplugins://nope"})),
        ],
    );

    let text = responses[0]["result"]["contents"][0]["text"].as_str().unwrap();
    let context: Value = serde_json::from_str(text).unwrap();
    assert_eq!(context["language"], "rust");
    assert_eq!(context["framework"], "cargo");
    assert_eq!(responses[1]["error"]["code"], -32602);
}

#[test]
fn test_mcp_bulk_without_gh_cli() {
    let workspace = create_test_workspace();
    let responses = session(
        &workspace,
        &[request(
            json!(8),
            "tools/call",
            json!({
                "name": "github_advanced",
                "arguments": {
                    "operation": "bulk_issue_operations",
                    "data": {"operations": [{"type": "create", "data": {"title": "A"}}]}
                }
            }),
        )],
    );

    let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
    let report: Value = serde_json::from_str(text).unwrap();
    assert_eq!(report["success"], false);
    assert_eq!(report["error"], "GitHub CLI not available or not authenticated");
}

#[test]
fn test_mcp_scaffold_then_analyze() {
    let workspace = TempDir::new().unwrap();
    let responses = session(
        &workspace,
        &[
            request(
                json!(9),
                "tools/call",
                json!({
                    "name": "project_scaffold",
                    "arguments": {"template": "python-cli", "name": "my-lib"}
                }),
            ),
            request(
                json!(10),
                "tools/call",
                json!({"name": "context_analyze", "arguments": {"path": "my-lib"}}),
            ),
        ],
    );

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["isError"], false);
    assert!(workspace.path().join("my-lib").is_dir());

    let text = responses[1]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Project analysis complete for"));
    assert!(text.contains("\"language\": \"python\""));
}
