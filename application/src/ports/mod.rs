//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod llm_gateway;
pub mod mcp_tools;
pub mod progress;
pub mod strategy_executor;
