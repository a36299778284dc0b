//! Configuration value objects for the domain layer
//!
//! These are domain concepts related to configuration that are
//! used across multiple layers.

pub mod env_key;
mod output_format;

pub use env_key::{EnvKeyInfo, ValueKind, known_env_keys, lookup_env_key};
pub use output_format::OutputFormat;
