//! LLM Gateway port
//!
//! Defines the interface for communicating with LLM providers.

use async_trait::async_trait;
use qcforge_domain::{LlmResponse, Model, ToolDefinition, ToolOutput};
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Errors that no retry or revision can fix: bad credentials or an
    /// unreachable endpoint.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::Authentication(_) | GatewayError::ConnectionError(_)
        )
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with LLM providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Create a new session with a system prompt
    async fn create_session(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError>;
}

/// An active LLM session
///
/// Sessions keep their own message history: each call appends the user turn
/// and the model's reply.
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Get the model used by this session
    fn model(&self) -> &Model;

    /// Send a message and get the text of the reply
    async fn send(&self, content: &str) -> Result<String, GatewayError>;

    /// Send a message with tool definitions available to the model
    async fn send_with_tools(
        &self,
        content: &str,
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError>;

    /// Return tool results for the previous tool use turn
    async fn send_tool_results(
        &self,
        results: &[ToolOutput],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(GatewayError::Authentication("401".into()).is_fatal());
        assert!(GatewayError::ConnectionError("refused".into()).is_fatal());
        assert!(!GatewayError::RateLimited("429".into()).is_fatal());
        assert!(!GatewayError::Timeout.is_fatal());
        assert!(
            !GatewayError::ApiError {
                status: 500,
                message: "boom".into()
            }
            .is_fatal()
        );
    }
}
