//! MCP server implementation.

use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::batch::panic_message;
use crate::error::{Error, Result};
use crate::mcp::codec;
use crate::mcp::handler::McpHandler;
use crate::mcp::prompts::{ListPromptsResult, PromptRegistry};
use crate::mcp::protocol::*;
use crate::mcp::resources::ResourceRegistry;
use crate::mcp::transport::Transport;
use crate::{SERVER_NAME, VERSION};

/// The closed set of methods the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
    PromptsList,
    PromptsGet,
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "initialize" => Self::Initialize,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "resources/list" => Self::ResourcesList,
            "resources/read" => Self::ResourcesRead,
            "prompts/list" => Self::PromptsList,
            "prompts/get" => Self::PromptsGet,
            other => return Err(Error::MethodNotFound(other.to_string())),
        })
    }
}

/// MCP server.
///
/// Registries are built before the server and only read afterwards.
pub struct McpServer {
    handler: Arc<McpHandler>,
    resources: Arc<ResourceRegistry>,
    prompts: Arc<PromptRegistry>,
    name: String,
    version: String,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(handler: McpHandler, resources: ResourceRegistry, prompts: PromptRegistry) -> Self {
        Self {
            handler: Arc::new(handler),
            resources: Arc::new(resources),
            prompts: Arc::new(prompts),
            name: SERVER_NAME.to_string(),
            version: VERSION.to_string(),
        }
    }

    /// Run the server until the input ends.
    ///
    /// Each request is answered and flushed before the next line is read.
    /// Only a failed write stops the loop with an error.
    pub async fn run<T: Transport>(&self, transport: &mut T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        loop {
            let line = match transport.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Input stream failed, stopping: {}", e);
                    break;
                }
            };

            let Some(response) = self.handle_line(&line).await else {
                continue;
            };

            let encoded = match codec::encode(&response) {
                Ok(encoded) => encoded,
                Err(e) => {
                    error!("Failed to encode response: {}", e);
                    let fallback = JsonRpcResponse::from_error(
                        response.id.clone(),
                        &Error::Internal(e.to_string()),
                    );
                    codec::encode(&fallback)?
                }
            };

            if let Err(e) = transport.write_line(&encoded).await {
                error!("Failed to write response: {}", e);
                return Err(e);
            }
        }

        info!("MCP server stopped");
        Ok(())
    }

    /// Decode and answer one input line. `None` means nothing is written.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        if line.trim().is_empty() {
            return None;
        }
        match codec::decode(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!("Undecodable line: {}", e);
                Some(JsonRpcResponse::from_error(None, &e))
            }
        }
    }

    /// Route one request. Notifications get no response.
    pub async fn dispatch(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if req.is_notification() {
            debug!("Notification: {}", req.method);
            return None;
        }
        debug!("Handling request: {} (id: {:?})", req.method, req.id);

        let method = match req.method.parse::<Method>() {
            Ok(method) => method,
            Err(e) => return Some(JsonRpcResponse::from_error(req.id, &e)),
        };

        let outcome = AssertUnwindSafe(self.route(method, req.params))
            .catch_unwind()
            .await;
        let response = match outcome {
            Ok(Ok(result)) => JsonRpcResponse::success(req.id, result),
            Ok(Err(e)) => {
                debug!("{} failed: {}", req.method, e);
                JsonRpcResponse::from_error(req.id, &e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Handler for {} panicked: {}", req.method, message);
                JsonRpcResponse::from_error(req.id, &Error::Internal(message))
            }
        };
        Some(response)
    }

    async fn route(&self, method: Method, params: Map<String, Value>) -> Result<Value> {
        match method {
            Method::Initialize => self.handle_initialize(),
            Method::ToolsList => self.handle_list_tools(),
            Method::ToolsCall => self.handle_call_tool(params).await,
            Method::ResourcesList => Ok(serde_json::to_value(self.resources.list())?),
            Method::ResourcesRead => self.handle_read_resource(params).await,
            Method::PromptsList => Ok(serde_json::to_value(ListPromptsResult {
                prompts: self.prompts.list(),
            })?),
            Method::PromptsGet => self.handle_get_prompt(params),
        }
    }

    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                resources: Some(ResourcesCapability::default()),
                prompts: Some(PromptsCapability::default()),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.handler.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_call_tool(&self, params: Map<String, Value>) -> Result<Value> {
        let name = required_str(&params, "name")?;
        let handler = self
            .handler
            .get_tool(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let arguments: HashMap<String, Value> = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            _ => HashMap::new(),
        };

        let result = handler.execute(arguments).await?;
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_read_resource(&self, params: Map<String, Value>) -> Result<Value> {
        let uri = required_str(&params, "uri")?;
        let result = self.resources.read(uri).await?;
        Ok(serde_json::to_value(result)?)
    }

    fn handle_get_prompt(&self, params: Map<String, Value>) -> Result<Value> {
        let name = required_str(&params, "name")?;
        let arguments = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let result = self.prompts.get(name, &arguments)?;
        Ok(serde_json::to_value(result)?)
    }
}

fn required_str<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidParams(format!("Missing required argument: {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::{success_result, ToolHandler};
    use crate::mcp::transport::LineTransport;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "echo".to_string(),
                description: "Echo the input".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
            Ok(success_result(
                args.get("text").and_then(Value::as_str).unwrap_or_default(),
            ))
        }
    }

    struct FaultyTool {
        panics: bool,
    }

    #[async_trait]
    impl ToolHandler for FaultyTool {
        fn definition(&self) -> Tool {
            let name = if self.panics { "panicky" } else { "faulty" };
            Tool {
                name: name.to_string(),
                description: "Always fails".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, _args: HashMap<String, Value>) -> Result<ToolResult> {
            if self.panics {
                panic!("handler blew up");
            }
            Err(Error::Command("gh exited with status 1".to_string()))
        }
    }

    fn server() -> McpServer {
        let mut handler = McpHandler::new();
        handler.register(EchoTool).unwrap();
        handler.register(FaultyTool { panics: false }).unwrap();
        handler.register(FaultyTool { panics: true }).unwrap();
        McpServer::new(handler, ResourceRegistry::new(), PromptRegistry::builtin().unwrap())
    }

    async fn roundtrip(server: &McpServer, input: &str) -> Vec<Value> {
        let mut transport = LineTransport::new(input.as_bytes(), Vec::new());
        server.run(&mut transport).await.unwrap();
        String::from_utf8(transport.into_writer())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("tools/call".parse::<Method>().unwrap(), Method::ToolsCall);
        let err = "frobnicate".parse::<Method>().unwrap_err();
        assert_eq!(err.code(), -32601);
    }

    #[tokio::test]
    async fn test_tools_list_keeps_order_and_id() {
        let out = roundtrip(&server(), "{\"method\":\"tools/list\",\"id\":\"1\"}\n").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], "1");
        assert_eq!(out[0]["jsonrpc"], "2.0");
        let names: Vec<&str> = out[0]["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["echo", "faulty", "panicky"]);
        assert!(out[0].get("error").is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let out = roundtrip(&server(), "{\"method\":\"frobnicate\",\"id\":\"2\"}\n").await;
        assert_eq!(
            out[0],
            json!({
                "jsonrpc": "2.0",
                "id": "2",
                "error": {"code": -32601, "message": "Method not found: frobnicate"}
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_line_then_request() {
        let input = "{not json\n{\"method\":\"tools/list\",\"id\":7}\n";
        let out = roundtrip(&server(), input).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], Value::Null);
        assert_eq!(out[0]["error"]["code"], -32603);
        assert_eq!(out[1]["id"], 7);
        assert!(out[1]["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let input = "{\"method\":\"tools/call\",\"params\":{\"name\":\"nope\"},\"id\":3}\n";
        let out = roundtrip(&server(), input).await;
        assert_eq!(out[0]["error"]["code"], -32602);
        assert_eq!(out[0]["error"]["message"], "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_tool_call_success() {
        let input = concat!(
            "{\"method\":\"tools/call\",",
            "\"params\":{\"name\":\"echo\",\"arguments\":{\"text\":\"hi\"}},\"id\":4}\n"
        );
        let out = roundtrip(&server(), input).await;
        assert_eq!(out[0]["result"]["content"][0], json!({"type": "text", "text": "hi"}));
        assert_eq!(out[0]["result"]["isError"], false);
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_become_internal_errors() {
        let input = concat!(
            "{\"method\":\"tools/call\",\"params\":{\"name\":\"faulty\"},\"id\":5}\n",
            "{\"method\":\"tools/call\",\"params\":{\"name\":\"panicky\"},\"id\":6}\n",
            "{\"method\":\"tools/list\",\"id\":7}\n",
        );
        let out = roundtrip(&server(), input).await;

        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["error"]["code"], -32603);
        assert_eq!(
            out[0]["error"]["message"],
            "Internal error: Command failed: gh exited with status 1"
        );
        assert_eq!(out[1]["error"]["code"], -32603);
        assert_eq!(out[1]["error"]["message"], "Internal error: handler blew up");
        assert_eq!(out[2]["id"], 7);
    }

    #[tokio::test]
    async fn test_notifications_and_blank_lines_get_no_reply() {
        let input = concat!(
            "\n{\"method\":\"notifications/initialized\"}\n",
            "   \n{\"method\":\"prompts/list\",\"id\":1}\n"
        );
        let out = roundtrip(&server(), input).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["result"]["prompts"][0]["name"], "create_command");
    }

    #[tokio::test]
    async fn test_idless_request_answered_with_null_id() {
        let out = roundtrip(&server(), "{\"method\":\"tools/list\"}\n").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], Value::Null);
        assert!(out[0]["result"].is_object());
    }

    #[tokio::test]
    async fn test_initialize() {
        let out = roundtrip(&server(), "{\"method\":\"initialize\",\"id\":0}\n").await;
        let result = &out[0]["result"];
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "ccplugins-mcp-server");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
    }

    #[tokio::test]
    async fn test_prompt_lookups() {
        let input = concat!(
            "{\"method\":\"prompts/get\",\"params\":{\"name\":\"optimize_workflow\",",
            "\"arguments\":{\"current_workflow\":\"manual deploys\"}},\"id\":1}\n",
            "{\"method\":\"prompts/get\",\"params\":{\"name\":\"nope\"},\"id\":2}\n",
            "{\"method\":\"prompts/get\",\"params\":{\"name\":\"optimize_workflow\"},\"id\":3}\n",
        );
        let out = roundtrip(&server(), input).await;

        let text = out[0]["result"]["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.contains("manual deploys"));
        assert_eq!(out[1]["error"]["message"], "Unknown prompt: nope");
        assert_eq!(out[2]["error"]["code"], -32602);
        assert_eq!(
            out[2]["error"]["message"],
            "Missing required argument: current_workflow"
        );
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let input =
            "{\"method\":\"resources/read\",\"params\":{\"uri\":\"ccplugins://nope\"},\"id\":1}\n";
        let out = roundtrip(&server(), input).await;
        assert_eq!(out[0]["error"]["code"], -32602);
        assert_eq!(out[0]["error"]["message"], "Unknown resource: ccplugins://nope");
    }

    /// Writer that always fails.
    struct BrokenPipe;

    impl tokio::io::AsyncWrite for BrokenPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_failure_stops_loop() {
        let input: &[u8] = b"{\"method\":\"tools/list\",\"id\":1}\n";
        let mut transport = LineTransport::new(input, BrokenPipe);
        let err = server().run(&mut transport).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
