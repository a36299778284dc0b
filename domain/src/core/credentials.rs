//! API credentials value object

use crate::core::error::DomainError;

/// Credentials for QuantConnect and the model provider (Value Object)
///
/// Built once at startup and never mutated afterwards: fields are private
/// and there are no setters. `Debug` redacts the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user_id: String,
    api_token: String,
    model_api_key: String,
}

impl Credentials {
    /// Create credentials, rejecting empty values
    pub fn new(
        user_id: impl Into<String>,
        api_token: impl Into<String>,
        model_api_key: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let user_id = non_empty(user_id.into(), "QUANTCONNECT_USER_ID")?;
        let api_token = non_empty(api_token.into(), "QUANTCONNECT_API_TOKEN")?;
        let model_api_key = non_empty(model_api_key.into(), "ANTHROPIC_API_KEY")?;

        Ok(Self {
            user_id,
            api_token,
            model_api_key,
        })
    }

    /// QuantConnect user id
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// QuantConnect API token
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Model provider API key
    pub fn model_api_key(&self) -> &str {
        &self.model_api_key
    }
}

fn non_empty(value: String, name: &'static str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::MissingCredential(name))
    } else {
        Ok(trimmed.to_string())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("api_token", &"<redacted>")
            .field("model_api_key", &"<redacted>")
            .finish()
    }
}
