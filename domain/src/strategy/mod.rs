//! Strategy domain: what gets generated, executed and revised.
//!
//! - [`entities::StrategyTask`]: the natural-language request
//! - [`entities::StrategyCode`]: extracted algorithm source
//! - [`report::ExecReport`]: outcome of one QuantConnect execution
//! - [`budget::Budget`]: bounded attempt and revision counters
//! - [`signature::ErrorSignature`]: order-independent identity of an error list
//! - [`outcome::PipelineOutcome`]: final result of a pipeline run

pub mod budget;
pub mod entities;
pub mod outcome;
pub mod report;
pub mod signature;
