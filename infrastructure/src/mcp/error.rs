//! Error types for the MCP adapter

use qcforge_application::ToolPortError;
use thiserror::Error;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur when talking to the QuantConnect MCP server
#[derive(Error, Debug)]
pub enum McpError {
    #[error("docker executable not found on PATH: {0}")]
    DockerNotFound(String),

    #[error("Failed to spawn MCP server: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("JSON-RPC error (code {code}): {message}")]
    RpcError { code: i64, message: String },

    #[error("Tool {tool} failed: {message}")]
    ToolError { tool: String, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

impl McpError {
    /// Whether the connection itself is gone (as opposed to one call failing)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            McpError::DockerNotFound(_)
                | McpError::SpawnError(_)
                | McpError::TransportClosed
                | McpError::UnexpectedResponse(_)
        )
    }
}

impl From<McpError> for ToolPortError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::ToolError { message, .. } => ToolPortError::ToolFailed(message),
            McpError::RpcError { .. } | McpError::SerializationError(_) => {
                ToolPortError::ToolFailed(err.to_string())
            }
            McpError::Timeout(what) => ToolPortError::Timeout(what),
            other => ToolPortError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_errors_stay_recoverable() {
        let err: ToolPortError = McpError::ToolError {
            tool: "read_compile".into(),
            message: "Project not found".into(),
        }
        .into();
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Project not found");
    }

    #[test]
    fn closed_transport_is_fatal() {
        let err: ToolPortError = McpError::TransportClosed.into();
        assert!(err.is_fatal());
        assert!(McpError::DockerNotFound("x".into()).is_transport());
        assert!(!McpError::Timeout("tools/call".into()).is_transport());
    }
}
