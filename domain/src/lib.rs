//! Domain layer for qcforge
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Revision loop
//!
//! A run turns a [`StrategyTask`] into a specification, then into
//! [`StrategyCode`], executes it on QuantConnect and reads back an
//! [`ExecReport`]. Failures become revision prompts until the code compiles,
//! backtests and trades, or the [`Budget`] runs out.
//!
//! ## Parsing
//!
//! Model replies are reduced to code with [`extract_python_code`]; build
//! output is reduced to error lines with [`extract_compile_errors`].

pub mod config;
pub mod core;
pub mod parsing;
pub mod prompt;
pub mod quantconnect;
pub mod session;
pub mod strategy;
pub mod tool;

// Re-export commonly used types
pub use config::OutputFormat;
pub use core::{credentials::Credentials, error::DomainError, model::Model};
pub use parsing::{extract_compile_errors, extract_python_code};
pub use prompt::{AgentPromptTemplate, PromptTemplate};
pub use session::{
    entities::{AgentRole, Conversation, Exchange},
    response::{ContentBlock, LlmResponse, StopReason},
};
pub use strategy::{
    budget::Budget,
    entities::{ProjectId, StrategyCode, StrategyTask},
    outcome::{PipelineOutcome, PipelineStatus},
    report::{ExecFailure, ExecReport},
    signature::ErrorSignature,
};
pub use tool::entities::{ToolCall, ToolDefinition, ToolOutput};
