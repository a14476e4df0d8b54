//! Error types for the CCPlugins MCP Server.

use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for CCPlugins operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the CCPlugins MCP server.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Protocol Errors =====
    #[error("Parse error: {0}")]
    Protocol(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),

    #[error("Unknown prompt: {0}")]
    PromptNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Duplicate capability: {0}")]
    DuplicateCapability(String),

    // ===== Collaborator Errors =====
    #[error("API error: {status} {status_text} - {message}")]
    Api {
        status: u16,
        status_text: String,
        message: String,
    },

    #[error("Command failed: {0}")]
    Command(String),

    #[error("{0}")]
    Scaffold(String),

    #[error("{0}")]
    Analysis(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an API error from HTTP response details.
    pub fn api(status: u16, status_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            status_text: status_text.into(),
            message: message.into(),
        }
    }

    /// JSON-RPC error code reported for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::ToolNotFound(_)
            | Self::ResourceNotFound(_)
            | Self::PromptNotFound(_)
            | Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Message surfaced to the client. Everything that lands on -32603 is
    /// prefixed so the client can tell an internal fault from a lookup miss.
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => self.to_string(),
            Self::InvalidParams(msg) => msg.clone(),
            _ if self.code() == error_codes::INTERNAL_ERROR => {
                format!("Internal error: {}", self)
            }
            _ => self.to_string(),
        }
    }
}
