//! JSON-RPC protocol types for MCP communication.
//!
//! The QuantConnect MCP server speaks JSON-RPC 2.0, one message per line
//! on stdin/stdout.
//!
//! # Protocol Overview
//!
//! - **Requests**: client → server (`initialize`, `tools/list`, `tools/call`)
//! - **Responses**: server → client (result or error)
//! - **Notifications**: either direction, no `id` (`notifications/initialized`)
//! - **Server requests**: server → client with `id` (`ping`)

use qcforge_domain::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Global request ID counter for JSON-RPC requests.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generates a unique request ID.
fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }
}

/// Outgoing JSON-RPC notification (no `id`, no reply expected)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response sent back for a server-initiated request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponseOut {
    pub jsonrpc: &'static str,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponseOut {
    pub fn new(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn method_not_found(id: u64, method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code: -32601,
                message: format!("Method not found: {}", method),
                data: None,
            }),
        }
    }
}

/// Parameters for `initialize`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: &'static str,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            capabilities: Value::Object(Default::default()),
            client_info: ClientInfo {
                name: "qcforge",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

/// Result of `tools/list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    pub next_cursor: Option<String>,
}

/// Parameters for `tools/call`
#[derive(Debug, Clone, Serialize)]
pub struct CallToolParams<'a> {
    pub name: &'a str,
    pub arguments: Value,
}

/// Result of `tools/call`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Flatten content blocks to text.
    ///
    /// Text blocks contribute their `text`; other blocks contribute their
    /// `data` as JSON, or the whole block as JSON. Blocks are joined with
    /// newlines.
    pub fn flatten(&self) -> String {
        self.content
            .iter()
            .map(|block| {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    text.to_string()
                } else if let Some(data) = block.get("data") {
                    data.to_string()
                } else {
                    block.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
