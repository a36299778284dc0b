//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording run events
//! (prompts and replies, execution reports, tool calls, the final outcome)
//! to a structured transcript.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! transcript in a machine-readable format (JSONL).

use chrono::{DateTime, Utc};
use qcforge_domain::{Exchange, ExecReport, PipelineOutcome};
use serde_json::{Value, json};

/// A structured conversation event for logging.
///
/// Each event has a type string, a UTC timestamp, and a JSON payload
/// containing event-specific fields.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "llm_exchange", "tool_call").
    pub event_type: &'static str,
    pub timestamp: DateTime<Utc>,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    /// Create a new conversation event with the current UTC timestamp.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn llm_exchange(exchange: &Exchange) -> Self {
        Self::new(
            "llm_exchange",
            json!({
                "agent": exchange.agent.as_str(),
                "prompt": exchange.prompt,
                "response": exchange.response,
            }),
        )
    }

    pub fn exec_report(attempt: usize, report: &ExecReport) -> Self {
        Self::new(
            "exec_report",
            json!({
                "attempt": attempt,
                "report": report,
            }),
        )
    }

    pub fn tool_call(name: &str, arguments: &Value, output: &str, is_error: bool) -> Self {
        Self::new(
            "tool_call",
            json!({
                "tool": name,
                "arguments": arguments,
                "output": output,
                "is_error": is_error,
            }),
        )
    }

    pub fn pipeline_outcome(outcome: &PipelineOutcome) -> Self {
        Self::new(
            "pipeline_outcome",
            json!({
                "status": outcome.status.as_str(),
                "attempts": outcome.attempts,
                "revisions": outcome.revisions,
                "report": outcome.report,
            }),
        )
    }
}

/// Port for logging conversation events to a structured log.
///
/// Implementations write each event as a single record (e.g., one JSONL line).
/// `log` is synchronous and infallible; write failures are dropped.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
