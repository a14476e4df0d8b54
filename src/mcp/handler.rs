//! Tool handlers and the tool registry.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with the given arguments.
    ///
    /// Collaborator failures should come back as `Ok(error_result(..))`;
    /// an `Err` is reserved for bad arguments and genuine internal faults.
    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<ToolResult>;
}

/// Registry of tool handlers, kept in registration order.
///
/// Built once at startup; the server takes ownership and only reads it.
#[derive(Default)]
pub struct McpHandler {
    tools: Vec<Arc<dyn ToolHandler>>,
    index: HashMap<String, usize>,
}

impl McpHandler {
    /// Create a new handler registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler. Tool names are unique.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) -> Result<()> {
        self.register_arc(Arc::new(handler))
    }

    /// Register a tool handler (Arc version).
    pub fn register_arc(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let name = handler.definition().name;
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateCapability(format!("tool {}", name)));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(handler);
        Ok(())
    }

    /// Get all registered tools, in registration order.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|h| h.definition()).collect()
    }

    /// Get a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to create a successful tool result.
pub fn success_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: false,
    }
}

/// Helper to create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: true,
    }
}

/// Helper to extract a required string argument.
pub fn get_string_arg(args: &HashMap<String, Value>, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| Error::InvalidParams(format!("Missing required argument: {}", name)))
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Helper to extract an optional integer argument.
pub fn get_optional_int_arg(args: &HashMap<String, Value>, name: &str) -> Option<i64> {
    args.get(name).and_then(|v| v.as_i64())
}

/// Helper to extract an object argument; absent or non-object yields an empty map.
pub fn get_object_arg(args: &HashMap<String, Value>, name: &str) -> Map<String, Value> {
    match args.get(name) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}
