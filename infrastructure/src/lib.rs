//! Infrastructure layer for qcforge
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the Anthropic Messages API client, the
//! QuantConnect MCP server client and executor, configuration loading,
//! and the JSONL transcript logger.

pub mod anthropic;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod quantconnect;

// Re-export commonly used types
pub use anthropic::{
    client::{AnthropicClient, AnthropicSettings, LlmError},
    gateway::AnthropicGateway,
    session::AnthropicSession,
};
pub use config::{
    ConfigError, ConfigFileSource, ConfigLoader, ConfigOverrides, ConfigSources, EnvFileSource,
    FileConfig,
};
pub use logging::JsonlConversationLogger;
pub use mcp::{
    client::{McpClient, McpTimeouts},
    error::McpError,
    launcher::DockerLaunch,
};
pub use quantconnect::{PollSettings, QcExecutor};
