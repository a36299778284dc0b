//! Application layer for qcforge
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{AgentParams, PipelineParams};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{GatewayError, LlmGateway, LlmSession},
    mcp_tools::{McpToolPort, ToolPortError},
    progress::{NoProgress, PipelinePhase, PipelineProgress},
    strategy_executor::{ExecRequest, ExecutorError, StrategyExecutor},
};
pub use use_cases::list_tools::{ListToolsOutput, ListToolsUseCase, ListedTool};
pub use use_cases::run_agent::{
    MAX_TURNS_MESSAGE, RunAgentError, RunAgentInput, RunAgentOutput, RunAgentUseCase,
};
pub use use_cases::run_pipeline::{RunPipelineError, RunPipelineInput, RunPipelineUseCase};
