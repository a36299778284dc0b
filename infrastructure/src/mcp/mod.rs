//! QuantConnect MCP server adapter
//!
//! Spawns the server container and implements [`McpToolPort`](qcforge_application::McpToolPort)
//! over JSON-RPC on its stdio.

pub mod client;
pub mod error;
pub mod launcher;
pub mod protocol;
pub mod transport;
