//! CCPlugins MCP Server
//!
//! Serves MCP over stdin/stdout. Logs go to stderr and, optionally, a file.

use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::FmtSubscriber;

use ccplugins_mcp::config::{Args, Config};
use ccplugins_mcp::error::{Error, Result};
use ccplugins_mcp::mcp::transport::StdioTransport;
use ccplugins_mcp::VERSION;

fn init_logging(config: &Config) -> Result<()> {
    let log_level = if config.debug { Level::DEBUG } else { Level::INFO };

    // stdout carries the protocol; logs never go there.
    let writer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(std::io::stderr.and(Arc::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(writer)
        .with_ansi(config.log_file.is_none())
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("Failed to set tracing subscriber: {}", e)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Build configuration from args
    let config: Config = args.into();
    init_logging(&config)?;

    info!("CCPlugins MCP Server v{}", VERSION);
    info!("Workspace: {:?}", config.workspace);

    let server = ccplugins_mcp::build_server(&config).await?;

    info!("Starting stdio transport...");
    let mut transport = StdioTransport::stdio();
    server.run(&mut transport).await
}
