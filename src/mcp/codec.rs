//! Line codec for JSON-RPC envelopes.
//!
//! One line in, one request out; one response in, one line out. The codec
//! never looks at what `method` or `params` mean.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};

/// Wire shape accepted on input. `jsonrpc` is tolerated but not required.
#[derive(Deserialize)]
struct RawRequest {
    method: Option<Value>,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    id: Option<Value>,
}

/// Decode one input line into a request.
pub fn decode(line: &str) -> Result<JsonRpcRequest> {
    let value: Value = serde_json::from_str(line.trim())
        .map_err(|e| Error::Protocol(format!("invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(Error::Protocol("envelope must be a JSON object".to_string()));
    }
    let raw: RawRequest = serde_json::from_value(value)
        .map_err(|e| Error::Protocol(format!("invalid JSON-RPC envelope: {}", e)))?;

    let method = match raw.method {
        Some(Value::String(method)) => method,
        Some(_) => return Err(Error::Protocol("method must be a string".to_string())),
        None => return Err(Error::Protocol("missing method".to_string())),
    };

    let id = match raw.id {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(RequestId::String(s)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) => Some(RequestId::Number(n)),
            None => return Err(Error::Protocol(format!("unsupported id: {}", n))),
        },
        Some(other) => return Err(Error::Protocol(format!("unsupported id: {}", other))),
    };

    let params = match raw.params {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    Ok(JsonRpcRequest { method, params, id })
}

/// Encode a response as exactly one newline-terminated line.
pub fn encode(response: &JsonRpcResponse) -> Result<String> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    Ok(line)
}
