//! Prompt domain
//!
//! Static instructions and the builders that turn execution results into
//! revision requests.

pub mod agent;
mod template;

pub use agent::AgentPromptTemplate;
pub use template::{
    MAX_ERRORS_IN_PROMPT, MAX_SPEC_LENGTH, PromptTemplate, QC_API_REFERENCE, REFERENCE_ALGORITHM,
};
