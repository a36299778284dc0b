//! Run Agent use case.
//!
//! Single-agent mode: one model session drives the QuantConnect MCP tools
//! directly through native tool use, with no deterministic executor in
//! between.

use crate::config::AgentParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use crate::ports::mcp_tools::{McpToolPort, ToolPortError};
use crate::ports::progress::{NoProgress, PipelineProgress};
use qcforge_domain::core::string::truncate;
use qcforge_domain::quantconnect::partition_tools;
use qcforge_domain::{
    AgentPromptTemplate, AgentRole, Conversation, Exchange, LlmResponse, Model, ToolCall,
    ToolDefinition, ToolOutput,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Text returned when the turn budget runs out
pub const MAX_TURNS_MESSAGE: &str = "Max iterations reached";

/// Errors that can occur during an agent run.
#[derive(Error, Debug)]
pub enum RunAgentError {
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),

    #[error("MCP error: {0}")]
    ToolError(#[from] ToolPortError),

    #[error("Agent timed out after {0:?}")]
    Timeout(Duration),
}

/// Input for the [`RunAgentUseCase`].
#[derive(Debug, Clone)]
pub struct RunAgentInput {
    /// The strategy request
    pub message: String,
    pub model: Model,
    pub params: AgentParams,
}

impl RunAgentInput {
    pub fn new(message: impl Into<String>, model: Model) -> Self {
        Self {
            message: message.into(),
            model,
            params: AgentParams::default(),
        }
    }

    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.params = params;
        self
    }
}

/// Result of an agent run
#[derive(Debug, Clone)]
pub struct RunAgentOutput {
    /// Final answer, or [`MAX_TURNS_MESSAGE`]
    pub final_text: String,
    /// Model turns used
    pub turns: usize,
    /// Tool calls executed
    pub tool_calls: usize,
    /// `false` when the turn budget ran out
    pub completed: bool,
    /// Tools the model was allowed to use
    pub tools: Vec<String>,
    pub history: Conversation,
}

/// Use case for running single-agent mode.
///
/// 1. List MCP tools and keep the allowlisted ones
/// 2. Send the request with those tools via [`send_with_tools()`](LlmSession::send_with_tools)
/// 3. Run requested tools through MCP and return the results, until the
///    model ends its turn or `max_turns` is reached
pub struct RunAgentUseCase {
    gateway: Arc<dyn LlmGateway>,
    tools: Arc<dyn McpToolPort>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RunAgentUseCase {
    pub fn new(gateway: Arc<dyn LlmGateway>, tools: Arc<dyn McpToolPort>) -> Self {
        Self {
            gateway,
            tools,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub async fn execute(&self, input: RunAgentInput) -> Result<RunAgentOutput, RunAgentError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the agent run, bounded by `params.timeout`.
    pub async fn execute_with_progress(
        &self,
        input: RunAgentInput,
        progress: &dyn PipelineProgress,
    ) -> Result<RunAgentOutput, RunAgentError> {
        let timeout = input.params.timeout;
        match tokio::time::timeout(timeout, self.run(input, progress)).await {
            Ok(result) => result,
            Err(_) => Err(RunAgentError::Timeout(timeout)),
        }
    }

    async fn run(
        &self,
        input: RunAgentInput,
        progress: &dyn PipelineProgress,
    ) -> Result<RunAgentOutput, RunAgentError> {
        info!("Starting agent run: {}", truncate(&input.message, 100));

        let available = self.tools.list_tools().await?;
        let (allowed, missing) = partition_tools(&available);
        for name in &missing {
            warn!("Tool not exposed by MCP server: {}", name);
        }
        debug!(
            "Agent: {} tools allowed, {} missing",
            allowed.len(),
            missing.len()
        );

        let system = AgentPromptTemplate::controller_system(
            &allowed,
            input.params.max_compile_attempts,
        );
        let session = self.gateway.create_session(&input.model, &system).await?;

        let prompt = AgentPromptTemplate::agent_prompt(&input.message);
        let max_turns = input.params.max_turns.max(1);

        progress.on_agent_turn(1, max_turns);
        let mut response = session.send_with_tools(&prompt, &allowed).await?;
        let mut turns = 1;
        let mut tool_calls = 0;
        let mut last_text = String::new();

        let completed = loop {
            let text = response.text_content();
            if !text.trim().is_empty() {
                last_text = text;
            }

            if response.is_final() {
                break true;
            }
            if turns >= max_turns {
                warn!("Agent reached max turns ({})", max_turns);
                break false;
            }

            let results = self.run_tools(&response, &allowed, progress).await?;
            tool_calls += results.len();

            turns += 1;
            progress.on_agent_turn(turns, max_turns);
            response = session.send_tool_results(&results, &allowed).await?;
        };

        let final_text = if completed {
            last_text
        } else {
            MAX_TURNS_MESSAGE.to_string()
        };

        let mut history = Conversation::new();
        let exchange = Exchange::new(AgentRole::Agent, &prompt, &final_text);
        self.conversation_logger
            .log(ConversationEvent::llm_exchange(&exchange));
        history.record(exchange);

        info!(
            "Agent finished after {} turns and {} tool calls",
            turns, tool_calls
        );

        Ok(RunAgentOutput {
            final_text,
            turns,
            tool_calls,
            completed,
            tools: allowed.into_iter().map(|t| t.name).collect(),
            history,
        })
    }

    /// Run every tool call in the response, in order.
    ///
    /// Tool failures become `Error: ...` results for the model; only a
    /// broken transport aborts.
    async fn run_tools(
        &self,
        response: &LlmResponse,
        allowed: &[ToolDefinition],
        progress: &dyn PipelineProgress,
    ) -> Result<Vec<ToolOutput>, RunAgentError> {
        let mut results = Vec::new();
        for call in response.tool_calls() {
            let output = self.run_tool(&call, allowed).await?;
            progress.on_tool_call(&call.name, !output.is_error);
            self.conversation_logger.log(ConversationEvent::tool_call(
                &call.name,
                &call.input,
                &output.content,
                output.is_error,
            ));
            results.push(output);
        }
        Ok(results)
    }

    async fn run_tool(
        &self,
        call: &ToolCall,
        allowed: &[ToolDefinition],
    ) -> Result<ToolOutput, RunAgentError> {
        if !allowed.iter().any(|t| t.name == call.name) {
            warn!("Model requested tool outside the allowlist: {}", call.name);
            return Ok(ToolOutput::error(
                &call.id,
                format!("Tool '{}' is not in the allowlist", call.name),
            ));
        }
        if !call.input.is_object() {
            return Ok(ToolOutput::error(
                &call.id,
                "arguments must be a JSON object",
            ));
        }

        debug!("Calling tool {} ({})", call.name, truncate(&call.input.to_string(), 200));
        match self.tools.call_tool(&call.name, call.input.clone()).await {
            Ok(text) => Ok(ToolOutput::success(&call.id, text)),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                Ok(ToolOutput::error(&call.id, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qcforge_domain::{ContentBlock, StopReason};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // ==================== Test Mocks ====================

    struct ScriptedSession {
        model: Model,
        responses: Mutex<VecDeque<LlmResponse>>,
        tool_results: Arc<Mutex<Vec<ToolOutput>>>,
    }

    #[async_trait]
    impl LlmSession for ScriptedSession {
        fn model(&self) -> &Model {
            &self.model
        }

        async fn send(&self, _content: &str) -> Result<String, GatewayError> {
            unreachable!("agent mode always sends tools")
        }

        async fn send_with_tools(
            &self,
            _content: &str,
            _tools: &[ToolDefinition],
        ) -> Result<LlmResponse, GatewayError> {
            self.next()
        }

        async fn send_tool_results(
            &self,
            results: &[ToolOutput],
            _tools: &[ToolDefinition],
        ) -> Result<LlmResponse, GatewayError> {
            self.tool_results.lock().unwrap().extend_from_slice(results);
            self.next()
        }
    }

    impl ScriptedSession {
        fn next(&self) -> Result<LlmResponse, GatewayError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| GatewayError::Other("No more responses".to_string()))
        }
    }

    struct MockGateway {
        session: Mutex<Option<Box<dyn LlmSession>>>,
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        async fn create_session(
            &self,
            _model: &Model,
            _system_prompt: &str,
        ) -> Result<Box<dyn LlmSession>, GatewayError> {
            self.session
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| GatewayError::Other("session already taken".to_string()))
        }
    }

    struct MockTools {
        fail_with: Option<fn() -> ToolPortError>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl McpToolPort for MockTools {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolPortError> {
            Ok(vec![
                ToolDefinition::new("create_project", "Create a project"),
                ToolDefinition::new("read_backtest", "Read a backtest"),
                ToolDefinition::new("delete_file", "Not allowlisted"),
            ])
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: serde_json::Value,
        ) -> Result<String, ToolPortError> {
            self.calls.lock().unwrap().push(name.to_string());
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(r#"{"projectId": 7}"#.to_string()),
            }
        }
    }

    fn tool_use(id: &str, name: &str) -> LlmResponse {
        LlmResponse {
            content: vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: json!({"name": "SPX"}),
            }],
            stop_reason: Some(StopReason::ToolUse),
            model: None,
        }
    }

    fn setup(
        responses: Vec<LlmResponse>,
        fail_with: Option<fn() -> ToolPortError>,
    ) -> (RunAgentUseCase, Arc<Mutex<Vec<ToolOutput>>>, Arc<MockTools>) {
        let tool_results = Arc::new(Mutex::new(Vec::new()));
        let session = ScriptedSession {
            model: Model::default(),
            responses: Mutex::new(VecDeque::from(responses)),
            tool_results: Arc::clone(&tool_results),
        };
        let gateway = Arc::new(MockGateway {
            session: Mutex::new(Some(Box::new(session))),
        });
        let tools = Arc::new(MockTools {
            fail_with,
            calls: Mutex::new(Vec::new()),
        });
        (
            RunAgentUseCase::new(gateway, tools.clone()),
            tool_results,
            tools,
        )
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_tool_loop_then_final_answer() {
        let (use_case, results, tools) = setup(
            vec![
                tool_use("t1", "create_project"),
                LlmResponse::from_text("Backtest complete: 12 trades."),
            ],
            None,
        );

        let output = use_case
            .execute(RunAgentInput::new("Iron condor", Model::default()))
            .await
            .unwrap();

        assert!(output.completed);
        assert_eq!(output.final_text, "Backtest complete: 12 trades.");
        assert_eq!(output.turns, 2);
        assert_eq!(output.tool_calls, 1);
        assert_eq!(output.tools, vec!["create_project", "read_backtest"]);
        assert_eq!(*tools.calls.lock().unwrap(), vec!["create_project"]);

        let results = results.lock().unwrap();
        assert_eq!(results[0].tool_use_id, "t1");
        assert_eq!(results[0].content, r#"{"projectId": 7}"#);
    }

    #[tokio::test]
    async fn test_disallowed_tool_is_refused_without_calling_mcp() {
        let (use_case, results, tools) = setup(
            vec![tool_use("t1", "delete_file"), LlmResponse::from_text("ok")],
            None,
        );

        use_case
            .execute(RunAgentInput::new("x", Model::default()))
            .await
            .unwrap();

        assert!(tools.calls.lock().unwrap().is_empty());
        let results = results.lock().unwrap();
        assert!(results[0].is_error);
        assert!(results[0].content.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_tool_failure_is_fed_back() {
        let (use_case, results, _) = setup(
            vec![tool_use("t1", "create_project"), LlmResponse::from_text("gave up")],
            Some(|| ToolPortError::ToolFailed("quota exceeded".to_string())),
        );

        let output = use_case
            .execute(RunAgentInput::new("x", Model::default()))
            .await
            .unwrap();

        assert_eq!(output.final_text, "gave up");
        assert_eq!(results.lock().unwrap()[0].content, "Error: quota exceeded");
    }

    #[tokio::test]
    async fn test_transport_failure_aborts() {
        let (use_case, _, _) = setup(
            vec![tool_use("t1", "create_project")],
            Some(|| ToolPortError::Transport("broken pipe".to_string())),
        );

        let err = use_case
            .execute(RunAgentInput::new("x", Model::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RunAgentError::ToolError(ToolPortError::Transport(_))));
    }

    #[tokio::test]
    async fn test_max_turns_reached() {
        let (use_case, _, tools) = setup(
            vec![
                tool_use("t1", "create_project"),
                tool_use("t2", "create_project"),
                tool_use("t3", "create_project"),
            ],
            None,
        );

        let input = RunAgentInput::new("x", Model::default())
            .with_params(AgentParams::default().with_max_turns(2));
        let output = use_case.execute(input).await.unwrap();

        assert!(!output.completed);
        assert_eq!(output.final_text, MAX_TURNS_MESSAGE);
        assert_eq!(output.turns, 2);
        assert_eq!(tools.calls.lock().unwrap().len(), 1);
    }
}
