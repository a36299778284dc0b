//! Structured LLM responses.
//!
//! The Messages API returns an array of content blocks that mixes text with
//! tool use requests. The pipeline only reads the text; agent mode also acts
//! on the tool use blocks.
//!
//! ```text
//! Text only:  send()            → String
//! Tool use:   send_with_tools() → LlmResponse → tool_calls()
//! ```

use crate::tool::entities::ToolCall;

/// A single block of content within an LLM response.
///
/// # Examples
///
/// ```
/// use qcforge_domain::session::response::ContentBlock;
///
/// let text = ContentBlock::Text("Listing projects.".to_string());
/// assert!(text.as_text().is_some());
///
/// let tool = ContentBlock::ToolUse {
///     id: "toolu_abc123".to_string(),
///     name: "list_projects".to_string(),
///     input: serde_json::json!({}),
/// };
/// assert!(tool.as_text().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),

    /// A tool use request; `id` correlates the later tool result.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Reason the model stopped generating.
///
/// When this is `ToolUse` the caller must run the requested tools and send
/// the results back with `send_tool_results()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    Other(String),
}

impl StopReason {
    pub fn parse(s: &str) -> Self {
        match s {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// A structured response from an LLM, supporting both text and tool use.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    /// Model identifier, if returned by the API
    pub model: Option<String>,
}

impl LlmResponse {
    /// Wrap plain text as a finished response
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(text.into())],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    /// Concatenate all `Text` blocks
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(ToolCall::new(id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// The model is done and wants no tools run
    pub fn is_final(&self) -> bool {
        !self.has_tool_calls() || self.stop_reason == Some(StopReason::EndTurn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_text_creates_text_only_response() {
        let response = LlmResponse::from_text("Hello");
        assert_eq!(response.text_content(), "Hello");
        assert!(!response.has_tool_calls());
        assert!(response.is_final());
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    }

    #[test]
    fn tool_calls_extraction() {
        let response = LlmResponse {
            content: vec![
                ContentBlock::Text("Creating the project.".to_string()),
                ContentBlock::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "create_project".to_string(),
                    input: json!({"name": "SPX", "language": "Py"}),
                },
                ContentBlock::Text(" Then compiling.".to_string()),
                ContentBlock::ToolUse {
                    id: "toolu_2".to_string(),
                    name: "create_compile".to_string(),
                    input: json!({"projectId": 12}),
                },
            ],
            stop_reason: Some(StopReason::ToolUse),
            model: Some("claude-sonnet-4-20250514".to_string()),
        };

        assert!(response.has_tool_calls());
        assert!(!response.is_final());
        assert_eq!(
            response.text_content(),
            "Creating the project. Then compiling."
        );

        let calls = response.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "create_project");
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(calls[1].input["projectId"], 12);
    }

    #[test]
    fn stop_reason_parse() {
        assert_eq!(StopReason::parse("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::parse("tool_use"), StopReason::ToolUse);
        assert_eq!(StopReason::parse("pause_turn"), StopReason::Other("pause_turn".into()));
    }
}
