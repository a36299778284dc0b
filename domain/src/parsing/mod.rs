//! Parsing of model output and QuantConnect error payloads.
//!
//! - [`code::extract_python_code`]: pull the algorithm out of a model reply
//! - [`compile_errors::extract_compile_errors`]: normalize compile failures

pub mod code;
pub mod compile_errors;

pub use code::extract_python_code;
pub use compile_errors::{NO_SPECIFIC_ERROR, extract_compile_errors};
