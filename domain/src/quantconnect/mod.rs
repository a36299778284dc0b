//! QuantConnect knowledge: tool names and payload parsing.
//!
//! The MCP server returns API responses as JSON text. These helpers read
//! the handful of fields the executor cares about and tolerate the shape
//! differences between endpoints (top-level vs nested `backtest`/`project`).

pub mod responses;
pub mod tools;

pub use responses::{BacktestSnapshot, CompileSnapshot, CompileState};
pub use tools::{QC_TOOLS, partition_tools};
