//! Anthropic LLM Gateway implementation

use crate::anthropic::client::{AnthropicClient, AnthropicSettings};
use crate::anthropic::session::AnthropicSession;
use async_trait::async_trait;
use qcforge_application::{GatewayError, LlmGateway, LlmSession};
use qcforge_domain::Model;
use std::sync::Arc;
use tracing::{debug, info};

/// LLM Gateway backed by the Anthropic Messages API
pub struct AnthropicGateway {
    client: Arc<AnthropicClient>,
}

impl AnthropicGateway {
    pub fn new(settings: AnthropicSettings) -> Result<Self, GatewayError> {
        info!("Anthropic gateway using {}", settings.base_url);
        let client = AnthropicClient::new(settings)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    async fn create_session(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        debug!(model = %model, "Creating Anthropic session");
        Ok(Box::new(AnthropicSession::new(
            Arc::clone(&self.client),
            model.clone(),
            system_prompt,
        )))
    }
}
