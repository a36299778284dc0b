//! Tool definitions and calls exchanged between the model and MCP.
//!
//! - [`entities::ToolDefinition`]: a tool advertised by an MCP server
//! - [`entities::ToolCall`]: a tool use request from the model
//! - [`entities::ToolOutput`]: the flattened result sent back

pub mod entities;
