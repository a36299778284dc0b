//! Conversation history and LLM response types.
//!
//! - [`entities::Conversation`]: ordered prompt/response exchanges of a run
//! - [`response::LlmResponse`]: structured model output (text and tool use)

pub mod entities;
pub mod response;
