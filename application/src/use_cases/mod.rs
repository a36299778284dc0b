//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod list_tools;
pub mod run_agent;
pub mod run_pipeline;
