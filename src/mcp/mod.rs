//! Model Context Protocol (MCP) implementation.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `codec` - One line of text to a request, a response to one line
//! - `transport` - Newline-delimited transport (stdio)
//! - `handler` - Tool handlers and the tool registry
//! - `resources` / `prompts` - The other two capability registries
//! - `server` - Method router and the read-dispatch-write loop

pub mod codec;
pub mod handler;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod transport;

pub use handler::McpHandler;
pub use prompts::PromptRegistry;
pub use protocol::*;
pub use resources::ResourceRegistry;
pub use server::McpServer;
pub use transport::{LineTransport, StdioTransport, Transport};
