//! Wire types for the Anthropic Messages API
//!
//! Converts between the JSON bodies of `POST /v1/messages` and the domain
//! `LlmResponse` / `ToolDefinition` / `ToolOutput` types.

use qcforge_domain::{ContentBlock, LlmResponse, StopReason, ToolDefinition, ToolOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Request ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub system: &'a str,
    pub messages: &'a [ApiMessage],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub tools: &'a [ApiTool],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiRole {
    User,
    Assistant,
}

/// One turn of the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: ApiRole,
    pub content: Vec<ApiContent>,
}

impl ApiMessage {
    pub fn user(content: Vec<ApiContent>) -> Self {
        Self {
            role: ApiRole::User,
            content,
        }
    }

    pub fn assistant(content: Vec<ApiContent>) -> Self {
        Self {
            role: ApiRole::Assistant,
            content,
        }
    }
}

/// Content block, in either direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types we do not model (thinking, server tools, ...)
    #[serde(other)]
    Unsupported,
}

impl ApiContent {
    pub fn text(text: impl Into<String>) -> Self {
        ApiContent::Text { text: text.into() }
    }
}

impl From<&ToolOutput> for ApiContent {
    fn from(output: &ToolOutput) -> Self {
        ApiContent::ToolResult {
            tool_use_id: output.tool_use_id.clone(),
            content: output.content.clone(),
            is_error: output.is_error,
        }
    }
}

/// Tool definition as the Messages API expects it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiTool {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub input_schema: Value,
}

impl From<&ToolDefinition> for ApiTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
        }
    }
}

// ─── Response ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ApiContent>,
    pub stop_reason: Option<String>,
    pub model: Option<String>,
}

impl MessagesResponse {
    /// Assistant turn to append to the history (unsupported blocks dropped).
    pub fn to_history(&self) -> ApiMessage {
        ApiMessage::assistant(
            self.content
                .iter()
                .filter(|c| !matches!(c, ApiContent::Unsupported))
                .cloned()
                .collect(),
        )
    }

    pub fn into_llm_response(self) -> LlmResponse {
        let content = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ApiContent::Text { text } => Some(ContentBlock::Text(text)),
                ApiContent::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                _ => None,
            })
            .collect();

        LlmResponse {
            content,
            stop_reason: self.stop_reason.as_deref().map(StopReason::parse),
            model: self.model,
        }
    }
}

/// Error body: `{"type": "error", "error": {"type": "...", "message": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
}

/// Best-effort human message from an error response body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => {
            if parsed.error.error_type.is_empty() {
                parsed.error.message
            } else {
                format!("{}: {}", parsed.error.error_type, parsed.error.message)
            }
        }
        _ => body.trim().to_string(),
    }
}
