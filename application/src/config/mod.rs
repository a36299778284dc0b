//! Application-level configuration.
//!
//! Parameters that control how the use cases loop:
//!
//! - [`PipelineParams`]: project, file and budgets for the revision loop
//! - [`AgentParams`]: turn limit and timeout for single-agent mode

pub mod agent_params;
pub mod pipeline_params;

pub use agent_params::AgentParams;
pub use pipeline_params::PipelineParams;
