//! CCPlugins MCP Server
//!
//! A Model Context Protocol (MCP) server that exposes issue trackers,
//! project scaffolding and project analysis to an AI assistant over stdio.
//!
//! # Architecture
//!
//! 1. **MCP Layer** (`mcp`) - Codec, transport, capability registries, router
//! 2. **Tools Layer** (`tools`) - The five tools behind `tools/call`
//! 3. **Batch Layer** (`batch`) - Sequential batch executor with per-item failure isolation
//! 4. **Integrations** (`integrations`) - GitHub CLI, Jira REST and Linear GraphQL clients
//! 5. **Service Layer** (`service`) - Project scaffolder and context analyzer

pub mod batch;
pub mod config;
pub mod error;
pub mod integrations;
pub mod mcp;
pub mod service;
pub mod tools;

pub use error::{Error, Result};

use tracing::info;

use crate::config::Config;
use crate::mcp::{McpHandler, McpServer, PromptRegistry, ResourceRegistry};
use crate::service::Services;

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name reported in `initialize`.
pub const SERVER_NAME: &str = "ccplugins-mcp-server";

/// Build collaborators and all three registries, then the server.
pub async fn build_server(config: &Config) -> Result<McpServer> {
    let services = Services::from_config(config).await?;

    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, &services)?;
    let resources = ResourceRegistry::builtin(&services)?;
    let prompts = PromptRegistry::builtin()?;
    info!(
        "Registered {} tools, {} resources, {} prompts",
        handler.tool_count(),
        resources.len(),
        prompts.list().len()
    );

    Ok(McpServer::new(handler, resources, prompts))
}
