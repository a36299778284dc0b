//! Anthropic LLM session implementation
//!
//! The Messages API is stateless, so the session keeps the conversation
//! history locally and sends all of it on every call.

use crate::anthropic::client::AnthropicClient;
use crate::anthropic::types::{ApiContent, ApiMessage, ApiTool, MessagesRequest};
use async_trait::async_trait;
use qcforge_application::{GatewayError, LlmSession};
use qcforge_domain::{LlmResponse, Model, ToolDefinition, ToolOutput};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AnthropicSession {
    client: Arc<AnthropicClient>,
    model: Model,
    system_prompt: String,
    /// Conversation history (stateless API requires full history each call)
    messages: Mutex<Vec<ApiMessage>>,
}

impl AnthropicSession {
    pub fn new(client: Arc<AnthropicClient>, model: Model, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            model,
            system_prompt: system_prompt.into(),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Append a user turn, call the API and append the assistant turn.
    ///
    /// A failed call leaves the history as it was.
    async fn send_user_message(
        &self,
        content: Vec<ApiContent>,
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        let api_tools: Vec<ApiTool> = tools.iter().map(ApiTool::from).collect();

        let mut messages = self.messages.lock().await;
        messages.push(ApiMessage::user(content));

        let request = MessagesRequest {
            model: self.model.as_str(),
            max_tokens: self.client.max_tokens(),
            system: &self.system_prompt,
            messages: &messages,
            tools: &api_tools,
        };

        match self.client.create_message(&request).await {
            Ok(response) => {
                messages.push(response.to_history());
                Ok(response.into_llm_response())
            }
            Err(e) => {
                messages.pop();
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl LlmSession for AnthropicSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, content: &str) -> Result<String, GatewayError> {
        let response = self
            .send_user_message(vec![ApiContent::text(content)], &[])
            .await?;
        Ok(response.text_content())
    }

    async fn send_with_tools(
        &self,
        content: &str,
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        self.send_user_message(vec![ApiContent::text(content)], tools)
            .await
    }

    async fn send_tool_results(
        &self,
        results: &[ToolOutput],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        let content = results.iter().map(ApiContent::from).collect();
        self.send_user_message(content, tools).await
    }
}
