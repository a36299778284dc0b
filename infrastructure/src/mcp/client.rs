//! MCP client for the QuantConnect MCP server.
//!
//! One client owns one server process. Requests are strictly sequential: the
//! transport lock is held from writing a request until its response arrives,
//! and any server requests or notifications seen in between are handled
//! inline.

use crate::mcp::error::{McpError, Result};
use crate::mcp::launcher::DockerLaunch;
use crate::mcp::protocol::{
    CallToolParams, CallToolResult, InitializeParams, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcResponseOut, ToolsListResult,
};
use crate::mcp::transport::{LineTransport, MessageKind, classify_message};
use async_trait::async_trait;
use qcforge_application::{McpToolPort, ToolPortError};
use qcforge_domain::ToolDefinition;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Timeout for `tools/list` during health checks.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeouts applied to MCP requests
#[derive(Debug, Clone, Copy)]
pub struct McpTimeouts {
    pub init: Duration,
    pub tool_call: Duration,
}

impl Default for McpTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(30),
            tool_call: Duration::from_secs(120),
        }
    }
}

/// Client connected to a running MCP server
pub struct McpClient {
    transport: Mutex<LineTransport>,
    /// Server process (killed on Drop to prevent orphans).
    child: Option<Child>,
    timeouts: McpTimeouts,
}

impl McpClient {
    /// Start the server container and perform the initialize handshake.
    pub async fn spawn(launch: &DockerLaunch, timeouts: McpTimeouts) -> Result<Self> {
        let docker = DockerLaunch::docker_path()?;
        info!("Starting MCP server from image {}", launch.image());
        debug!("docker {}", launch.args().join(" "));

        let mut child = launch.command(&docker).spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::SpawnError(std::io::Error::other("Failed to capture stdin")))?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::SpawnError(std::io::Error::other("Failed to capture stdout"))
        })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("mcp-server: {}", line);
                }
            });
        }

        let mut client = Self::with_transport(LineTransport::new(stdout, stdin), timeouts);
        client.child = Some(child);
        client.initialize().await?;
        Ok(client)
    }

    /// Wrap an already connected transport (no handshake).
    pub fn with_transport(transport: LineTransport, timeouts: McpTimeouts) -> Self {
        Self {
            transport: Mutex::new(transport),
            child: None,
            timeouts,
        }
    }

    /// `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&self) -> Result<Value> {
        let params = serde_json::to_value(InitializeParams::default())?;
        let result = self
            .request_with_timeout("initialize", Some(params), self.timeouts.init)
            .await?;

        let server = result
            .pointer("/serverInfo/name")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        info!("MCP server initialized: {}", server);

        let mut transport = self.transport.lock().await;
        transport
            .send(&JsonRpcNotification::new("notifications/initialized"))
            .await?;
        Ok(result)
    }

    /// All tools the server exposes, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self
                .request_with_timeout("tools/list", params, self.timeouts.tool_call)
                .await?;
            let page: ToolsListResult = serde_json::from_value(result)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        debug!("MCP server exposes {} tools", tools.len());
        Ok(tools)
    }

    /// Call a tool and flatten its content to text.
    ///
    /// A result flagged `isError` becomes [`McpError::ToolError`].
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let params = serde_json::to_value(CallToolParams { name, arguments })?;
        let result = self
            .request_with_timeout("tools/call", Some(params), self.timeouts.tool_call)
            .await?;
        let result: CallToolResult = serde_json::from_value(result)?;
        let text = result.flatten();
        debug!("Tool {} returned {} bytes", name, text.len());

        if result.is_error {
            Err(McpError::ToolError {
                tool: name.to_string(),
                message: text,
            })
        } else {
            Ok(text)
        }
    }

    /// Whether the server answers `tools/list` within five seconds.
    pub async fn health_check(&self) -> bool {
        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, self.request("tools/list", None)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("MCP health check failed: {}", e);
                false
            }
            Err(_) => {
                warn!("MCP health check timed out");
                false
            }
        }
    }

    async fn request_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        tokio::time::timeout(timeout, self.request(method, params))
            .await
            .map_err(|_| McpError::Timeout(method.to_string()))?
    }

    /// Send a request and wait for the response with the same id.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let request = JsonRpcRequest::new(method, params);
        let mut transport = self.transport.lock().await;
        transport.send(&request).await?;

        loop {
            let message = transport.recv().await?;
            match classify_message(&message) {
                MessageKind::Response => {
                    let response: JsonRpcResponse = serde_json::from_value(message)?;
                    if response.id != Some(request.id) {
                        debug!(
                            "Ignoring response for id {:?} while waiting for {}",
                            response.id, request.id
                        );
                        continue;
                    }
                    if let Some(error) = response.error {
                        return Err(McpError::RpcError {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return Ok(response.result.unwrap_or(Value::Null));
                }
                MessageKind::IncomingRequest { id } => {
                    let server_method = message
                        .get("method")
                        .and_then(|m| m.as_str())
                        .unwrap_or_default();
                    let reply = if server_method == "ping" {
                        JsonRpcResponseOut::new(id, json!({}))
                    } else {
                        warn!("Unsupported server request: {}", server_method);
                        JsonRpcResponseOut::method_not_found(id, server_method)
                    };
                    transport.send(&reply).await?;
                }
                MessageKind::Notification => {
                    debug!(
                        "MCP notification: {}",
                        message
                            .get("method")
                            .and_then(|m| m.as_str())
                            .unwrap_or("<none>")
                    );
                }
            }
        }
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            debug!("McpClient dropping, killing MCP server process");
            let _ = child.start_kill();
        }
    }
}

#[async_trait]
impl McpToolPort for McpClient {
    async fn list_tools(&self) -> std::result::Result<Vec<ToolDefinition>, ToolPortError> {
        McpClient::list_tools(self).await.map_err(Into::into)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> std::result::Result<String, ToolPortError> {
        McpClient::call_tool(self, name, arguments)
            .await
            .map_err(Into::into)
    }
}
