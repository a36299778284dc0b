//! QuantConnect strategy executor over MCP tools

pub mod executor;

pub use executor::{PollSettings, QcExecutor};
