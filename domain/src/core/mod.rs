//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: Anthropic model identifiers and aliases
//! - [`credentials::Credentials`]: immutable API credentials
//! - [`error::DomainError`]: domain-level errors

pub mod credentials;
pub mod error;
pub mod model;
pub mod string;
