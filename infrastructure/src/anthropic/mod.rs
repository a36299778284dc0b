//! Anthropic Messages API adapter
//!
//! Implements `LlmGateway` over HTTP with `reqwest`.

pub mod client;
pub mod gateway;
pub mod session;
pub mod types;
