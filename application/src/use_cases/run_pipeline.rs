//! Run Pipeline use case
//!
//! Orchestrates the spec → code → execute → revise flow.

use crate::config::PipelineParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use crate::ports::progress::{NoProgress, PipelinePhase, PipelineProgress};
use crate::ports::strategy_executor::{ExecRequest, ExecutorError, StrategyExecutor};
use qcforge_domain::parsing::NO_SPECIFIC_ERROR;
use qcforge_domain::{
    AgentRole, Budget, Conversation, DomainError, ErrorSignature, Exchange, ExecFailure,
    ExecReport, Model, PipelineOutcome, PipelineStatus, ProjectId, PromptTemplate, StrategyCode,
    StrategyTask, extract_python_code,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a pipeline run
///
/// Strategy failures never end up here; they are part of the
/// [`PipelineOutcome`].
#[derive(Error, Debug)]
pub enum RunPipelineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Code agent did not produce any Python code")]
    NoCode,

    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),

    #[error("Execution error: {0}")]
    ExecutorError(#[from] ExecutorError),
}

/// Input for the RunPipeline use case
#[derive(Debug, Clone)]
pub struct RunPipelineInput {
    pub task: StrategyTask,
    pub model: Model,
    pub params: PipelineParams,
}

impl RunPipelineInput {
    pub fn new(task: StrategyTask, model: Model) -> Self {
        Self {
            task,
            model,
            params: PipelineParams::default(),
        }
    }

    pub fn with_params(mut self, params: PipelineParams) -> Self {
        self.params = params;
        self
    }
}

/// Mutable state of one run
struct RunState {
    attempts: Budget,
    revisions: Budget,
    history: Conversation,
    code: StrategyCode,
    project_id: Option<ProjectId>,
    seen_signatures: HashSet<ErrorSignature>,
    last_report: Option<ExecReport>,
}

/// Use case for running the strategy pipeline
pub struct RunPipelineUseCase {
    gateway: Arc<dyn LlmGateway>,
    executor: Arc<dyn StrategyExecutor>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RunPipelineUseCase {
    pub fn new(gateway: Arc<dyn LlmGateway>, executor: Arc<dyn StrategyExecutor>) -> Self {
        Self {
            gateway,
            executor,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(
        &self,
        input: RunPipelineInput,
    ) -> Result<PipelineOutcome, RunPipelineError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunPipelineInput,
        progress: &dyn PipelineProgress,
    ) -> Result<PipelineOutcome, RunPipelineError> {
        let attempts = Budget::attempts(input.params.max_attempts)?;
        let revisions = Budget::new(input.params.max_revisions);
        let mut history = Conversation::new();

        info!(
            "Starting pipeline for project {} with {} (attempts: {}, revisions: {})",
            input.params.project_name,
            input.model,
            attempts.max(),
            revisions.max()
        );

        let spec = self.phase_spec(&input, &mut history, progress).await?;
        let (code_session, code) = self
            .phase_code(&input, &spec, &mut history, progress)
            .await?;

        let mut state = RunState {
            attempts,
            revisions,
            history,
            code,
            project_id: None,
            seen_signatures: HashSet::new(),
            last_report: None,
        };

        let status = self
            .revision_loop(&input, code_session.as_ref(), &mut state, progress)
            .await?;

        info!(
            "Pipeline finished: {} after {} attempts and {} revisions",
            status,
            state.attempts.used(),
            state.revisions.used()
        );
        progress.on_finished(status);

        let outcome = PipelineOutcome {
            status,
            attempts: state.attempts.used(),
            max_attempts: state.attempts.max(),
            revisions: state.revisions.used(),
            spec,
            code: state.code,
            report: state.last_report,
            history: state.history,
        };
        self.conversation_logger
            .log(ConversationEvent::pipeline_outcome(&outcome));
        Ok(outcome)
    }

    /// Phase 1: turn the task into a strategy specification
    async fn phase_spec(
        &self,
        input: &RunPipelineInput,
        history: &mut Conversation,
        progress: &dyn PipelineProgress,
    ) -> Result<String, RunPipelineError> {
        info!("Phase 1: Specification");
        let phase = PipelinePhase::Spec;
        progress.on_phase_start(&phase);

        let result = async {
            let session = self
                .gateway
                .create_session(&input.model, PromptTemplate::spec_system())
                .await?;
            session.send(input.task.content()).await
        }
        .await;

        let spec = match result {
            Ok(spec) => spec,
            Err(e) => {
                progress.on_phase_complete(&phase, false);
                return Err(e.into());
            }
        };

        debug!("Specification: {} chars", spec.len());
        self.record(
            history,
            Exchange::new(AgentRole::Spec, input.task.content(), &spec),
        );
        progress.on_phase_complete(&phase, true);
        Ok(spec)
    }

    /// Phase 2: first implementation. The session is kept for revisions.
    async fn phase_code(
        &self,
        input: &RunPipelineInput,
        spec: &str,
        history: &mut Conversation,
        progress: &dyn PipelineProgress,
    ) -> Result<(Box<dyn LlmSession>, StrategyCode), RunPipelineError> {
        info!("Phase 2: Code generation");
        let phase = PipelinePhase::Code;
        progress.on_phase_start(&phase);

        let prompt = PromptTemplate::code_prompt(spec);
        let result = async {
            let session = self
                .gateway
                .create_session(&input.model, &PromptTemplate::code_system())
                .await?;
            let reply = session.send(&prompt).await?;
            Ok::<_, GatewayError>((session, reply))
        }
        .await;

        let (session, reply) = match result {
            Ok(ok) => ok,
            Err(e) => {
                progress.on_phase_complete(&phase, false);
                return Err(e.into());
            }
        };
        self.record(history, Exchange::new(AgentRole::Code, &prompt, &reply));

        let Some(code) = extract_python_code(&reply).and_then(|c| StrategyCode::new(c).ok())
        else {
            progress.on_phase_complete(&phase, false);
            return Err(RunPipelineError::NoCode);
        };

        debug!("Generated code: {} lines", code.line_count());
        progress.on_phase_complete(&phase, true);
        Ok((session, code))
    }

    /// Phase 3: execute, classify, revise
    async fn revision_loop(
        &self,
        input: &RunPipelineInput,
        code_session: &dyn LlmSession,
        state: &mut RunState,
        progress: &dyn PipelineProgress,
    ) -> Result<PipelineStatus, RunPipelineError> {
        while let Some(attempt) = state.attempts.try_consume() {
            info!(
                "Attempt {}/{} (revisions: {}/{})",
                attempt,
                state.attempts.max(),
                state.revisions.used(),
                state.revisions.max()
            );

            let phase = PipelinePhase::Execute {
                attempt,
                max_attempts: state.attempts.max(),
            };
            progress.on_phase_start(&phase);

            let request = ExecRequest::new(
                &input.params.project_name,
                &input.params.file_name,
                state.code.clone(),
            )
            .with_project_id(state.project_id)
            .with_attempt(attempt);

            let report = match self.executor.execute(&request).await {
                Ok(report) => report,
                Err(e) => {
                    progress.on_phase_complete(&phase, false);
                    return Err(e.into());
                }
            };

            if report.project_id.is_some() {
                state.project_id = report.project_id;
            }
            self.conversation_logger
                .log(ConversationEvent::exec_report(attempt, &report));
            progress.on_phase_complete(&phase, report.is_success());
            progress.on_exec_report(attempt, &report);
            info!("Attempt {}: {}", attempt, report.summary());

            let failure = report.failure();
            state.last_report = Some(report);

            let Some(failure) = failure else {
                return Ok(PipelineStatus::Succeeded);
            };

            // Setup and incomplete runs retry the same code without a revision
            if let ExecFailure::Setup(reason) | ExecFailure::Incomplete(reason) = &failure {
                let message = format!(
                    "Attempt {} did not complete: {} ({} attempts left)",
                    attempt,
                    reason,
                    state.attempts.remaining()
                );
                warn!("{}", message);
                progress.on_warning(&message);
                continue;
            }

            if state.revisions.is_exhausted() {
                warn!("Revision budget ({}) used up", state.revisions.max());
                return Ok(PipelineStatus::RevisionLimitReached);
            }

            if let ExecFailure::Compile(errors) = &failure {
                let signature = ErrorSignature::from_errors(errors);
                if !state.seen_signatures.insert(signature) {
                    warn!("Same compile errors repeated, stopping");
                    return Ok(PipelineStatus::RepeatedErrors);
                }
            }

            if state.attempts.is_exhausted() {
                break;
            }

            let prompt = match &failure {
                ExecFailure::Compile(errors) => {
                    let errors = if errors.is_empty() {
                        vec![NO_SPECIFIC_ERROR.to_string()]
                    } else {
                        errors.clone()
                    };
                    PromptTemplate::compile_retry_prompt(&state.code, &errors)
                }
                ExecFailure::Runtime { error, stacktrace } => {
                    PromptTemplate::runtime_error_prompt(&state.code, error, stacktrace.as_deref())
                }
                ExecFailure::NoTrades => {
                    let info = state
                        .last_report
                        .as_ref()
                        .and_then(|r| serde_json::to_string_pretty(r).ok());
                    PromptTemplate::zero_trades_prompt(&state.code, info.as_deref())
                }
                ExecFailure::Setup(_) | ExecFailure::Incomplete(_) => continue,
            };

            let revised = self
                .request_revision(code_session, &prompt, state, progress)
                .await?;
            if revised && matches!(failure, ExecFailure::NoTrades) {
                state.seen_signatures.clear();
            }
        }

        Ok(PipelineStatus::AttemptsExhausted)
    }

    /// Ask the code agent for a revision. Returns whether new code was accepted.
    ///
    /// Recoverable gateway errors are reported and the loop carries on with
    /// the current code; fatal ones propagate.
    async fn request_revision(
        &self,
        session: &dyn LlmSession,
        prompt: &str,
        state: &mut RunState,
        progress: &dyn PipelineProgress,
    ) -> Result<bool, RunPipelineError> {
        let phase = PipelinePhase::Revise {
            revision: state.revisions.used() + 1,
        };
        progress.on_phase_start(&phase);

        let reply = match session.send(prompt).await {
            Ok(reply) => reply,
            Err(e) if e.is_fatal() => {
                progress.on_phase_complete(&phase, false);
                return Err(e.into());
            }
            Err(e) => {
                let message = format!("Revision request failed: {}", e);
                warn!("{}", message);
                progress.on_warning(&message);
                progress.on_phase_complete(&phase, false);
                return Ok(false);
            }
        };
        self.record(
            &mut state.history,
            Exchange::new(AgentRole::Code, prompt, &reply),
        );

        let new_code = extract_python_code(&reply).and_then(|c| StrategyCode::new(c).ok());
        match new_code {
            Some(code) if code != state.code => {
                let revision = state.revisions.consume()?;
                info!("Code revised (revision #{})", revision);
                state.code = code;
                progress.on_phase_complete(&phase, true);
                Ok(true)
            }
            Some(_) => {
                let message = "Code agent returned unchanged code";
                warn!("{}", message);
                progress.on_warning(message);
                progress.on_phase_complete(&phase, false);
                Ok(false)
            }
            None => {
                let message = "Code agent reply contained no code";
                warn!("{}", message);
                progress.on_warning(message);
                progress.on_phase_complete(&phase, false);
                Ok(false)
            }
        }
    }

    fn record(&self, history: &mut Conversation, exchange: Exchange) {
        self.conversation_logger
            .log(ConversationEvent::llm_exchange(&exchange));
        history.record(exchange);
    }
}
