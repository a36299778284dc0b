//! MCP tool port
//!
//! The QuantConnect MCP server as the application sees it: a list of tools
//! and a way to call them. Results come back flattened to text.

use async_trait::async_trait;
use qcforge_domain::ToolDefinition;
use thiserror::Error;

/// Errors from calling MCP tools
#[derive(Error, Debug)]
pub enum ToolPortError {
    /// The server ran the tool and reported an error (`isError` or a JSON-RPC error)
    #[error("{0}")]
    ToolFailed(String),

    #[error("Tool call timed out: {0}")]
    Timeout(String),

    /// The connection to the server is gone
    #[error("MCP transport error: {0}")]
    Transport(String),
}

impl ToolPortError {
    /// Transport failures end the run; tool failures are reported and recovered from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolPortError::Transport(_))
    }
}

/// Port for listing and calling MCP tools
#[async_trait]
pub trait McpToolPort: Send + Sync {
    /// Tools advertised by the server
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolPortError>;

    /// Call a tool, returning its text output
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ToolPortError>;
}
