//! Deterministic project → upload → compile → backtest sequence.
//!
//! Tool failures are recorded in the report's notes and end the attempt;
//! transport failures and credential rejections are returned as errors.

use async_trait::async_trait;
use qcforge_application::{ExecRequest, ExecutorError, McpToolPort, StrategyExecutor, ToolPortError};
use qcforge_domain::quantconnect::responses::{
    find_project_by_name, is_auth_rejection, order_count, parse_payload, project_id,
};
use qcforge_domain::quantconnect::tools::{
    CREATE_BACKTEST, CREATE_COMPILE, CREATE_FILE, CREATE_PROJECT, LIST_PROJECTS, READ_BACKTEST,
    READ_BACKTEST_ORDERS, READ_COMPILE, UPDATE_FILE_CONTENTS,
};
use qcforge_domain::quantconnect::{BacktestSnapshot, CompileSnapshot, CompileState};
use qcforge_domain::{ExecReport, ProjectId, extract_compile_errors};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Tools without which no attempt can run
const REQUIRED_TOOLS: [&str; 5] = [
    CREATE_PROJECT,
    CREATE_COMPILE,
    READ_COMPILE,
    CREATE_BACKTEST,
    READ_BACKTEST,
];

/// How often and how long to poll compile and backtest status
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub compile_attempts: u32,
    pub compile_interval: Duration,
    pub backtest_attempts: u32,
    pub backtest_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            compile_attempts: 20,
            compile_interval: Duration::from_secs(3),
            backtest_attempts: 30,
            backtest_interval: Duration::from_secs(10),
        }
    }
}

impl PollSettings {
    pub fn with_intervals(mut self, compile: Duration, backtest: Duration) -> Self {
        self.compile_interval = compile;
        self.backtest_interval = backtest;
        self
    }
}

/// [`StrategyExecutor`] driving the QuantConnect MCP tools
pub struct QcExecutor {
    tools: Arc<dyn McpToolPort>,
    poll: PollSettings,
    /// Names the server exposes, fetched on first use
    available: OnceCell<HashSet<String>>,
}

impl QcExecutor {
    pub fn new(tools: Arc<dyn McpToolPort>) -> Self {
        Self {
            tools,
            poll: PollSettings::default(),
            available: OnceCell::new(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    async fn available_tools(&self) -> Result<&HashSet<String>, ExecutorError> {
        let tools = self.tools.clone();
        let available = self
            .available
            .get_or_try_init(|| async move {
                let listed = tools.list_tools().await.map_err(to_executor_error)?;
                Ok::<_, ExecutorError>(listed.into_iter().map(|t| t.name).collect::<HashSet<_>>())
            })
            .await?;

        let missing: Vec<&str> = REQUIRED_TOOLS
            .iter()
            .copied()
            .filter(|name| !available.contains(*name))
            .collect();
        if !missing.is_empty() {
            return Err(ExecutorError::Unavailable(format!(
                "MCP server lacks required tools: {}",
                missing.join(", ")
            )));
        }
        Ok(available)
    }

    /// Call a tool; tool-level failures become a note and `None`.
    ///
    /// A rejected user id / token is fatal: no later attempt can succeed.
    async fn call(
        &self,
        name: &str,
        arguments: Value,
        report: &mut ExecReport,
    ) -> Result<Option<String>, ExecutorError> {
        debug!("Calling {} with {}", name, arguments);
        match self.tools.call_tool(name, arguments).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_fatal() => Err(to_executor_error(e)),
            Err(ToolPortError::ToolFailed(message)) if is_auth_rejection(&message) => {
                Err(ExecutorError::Authentication(format!("{}: {}", name, message)))
            }
            Err(e) => {
                warn!("{} failed: {}", name, e);
                report.note(format!("{} failed: {}", name, e));
                Ok(None)
            }
        }
    }

    async fn resolve_project(
        &self,
        request: &ExecRequest,
        available: &HashSet<String>,
        report: &mut ExecReport,
    ) -> Result<Option<ProjectId>, ExecutorError> {
        if let Some(id) = request.project_id {
            return Ok(Some(id));
        }

        if available.contains(LIST_PROJECTS)
            && let Some(raw) = self.call(LIST_PROJECTS, json!({}), report).await?
            && let Some(id) = parse_payload(&raw)
                .as_ref()
                .and_then(|v| find_project_by_name(v, &request.project_name))
        {
            info!("Reusing project {} ({})", request.project_name, id);
            return Ok(Some(id));
        }

        let args = json!({"name": request.project_name, "language": "Py"});
        let Some(raw) = self.call(CREATE_PROJECT, args, report).await? else {
            return Ok(None);
        };
        match parse_payload(&raw).as_ref().and_then(project_id) {
            Some(id) => {
                info!("Created project {} ({})", request.project_name, id);
                Ok(Some(id))
            }
            None => {
                report.note(format!("create_project returned no projectId: {}", preview(&raw)));
                Ok(None)
            }
        }
    }

    async fn upload(
        &self,
        request: &ExecRequest,
        project: ProjectId,
        available: &HashSet<String>,
        report: &mut ExecReport,
    ) -> Result<bool, ExecutorError> {
        let args = json!({
            "projectId": project.value(),
            "name": request.file_name,
            "content": request.code.as_str(),
        });

        if available.contains(UPDATE_FILE_CONTENTS)
            && self
                .call(UPDATE_FILE_CONTENTS, args.clone(), report)
                .await?
                .is_some()
        {
            return Ok(true);
        }
        if available.contains(CREATE_FILE) {
            return Ok(self.call(CREATE_FILE, args, report).await?.is_some());
        }
        report.note("no tool available to upload the strategy file");
        Ok(false)
    }

    /// Returns the compile id once the build succeeded.
    async fn compile(
        &self,
        project: ProjectId,
        report: &mut ExecReport,
    ) -> Result<Option<String>, ExecutorError> {
        let args = json!({"projectId": project.value()});
        let Some(raw) = self.call(CREATE_COMPILE, args, report).await? else {
            return Ok(None);
        };
        let mut last_raw = raw.clone();
        let mut snapshot = snapshot_compile(&raw);
        let Some(compile_id) = snapshot.compile_id.clone() else {
            report.note(format!("create_compile returned no compileId: {}", preview(&raw)));
            return Ok(None);
        };

        let mut polls = 0;
        while !snapshot.state.is_finished() && polls < self.poll.compile_attempts {
            polls += 1;
            tokio::time::sleep(self.poll.compile_interval).await;
            let args = json!({"projectId": project.value(), "compileId": compile_id});
            if let Some(raw) = self.call(READ_COMPILE, args, report).await? {
                snapshot = snapshot_compile(&raw);
                last_raw = raw;
            }
        }

        match snapshot.state {
            CompileState::BuildSuccess => {
                info!("Compile {} succeeded", compile_id);
                report.compile_ok = true;
                report.compile_id = Some(compile_id.clone());
                Ok(Some(compile_id))
            }
            CompileState::BuildError => {
                let errors = if snapshot.errors.is_empty() {
                    extract_compile_errors(&last_raw)
                } else {
                    snapshot.errors
                };
                info!("Compile {} failed with {} errors", compile_id, errors.len());
                report.compile_id = Some(compile_id);
                report.compile_errors = errors;
                Ok(None)
            }
            _ => {
                report.note(format!(
                    "compile {} did not finish after {} checks",
                    compile_id, polls
                ));
                Ok(None)
            }
        }
    }

    async fn backtest(
        &self,
        request: &ExecRequest,
        project: ProjectId,
        compile_id: &str,
        available: &HashSet<String>,
        report: &mut ExecReport,
    ) -> Result<(), ExecutorError> {
        let args = json!({
            "projectId": project.value(),
            "compileId": compile_id,
            "backtestName": request.backtest_name(),
        });
        let Some(raw) = self.call(CREATE_BACKTEST, args, report).await? else {
            return Ok(());
        };
        let mut snapshot = snapshot_backtest(&raw);
        let Some(backtest_id) = snapshot.backtest_id.clone() else {
            report.note(format!("create_backtest returned no backtestId: {}", preview(&raw)));
            return Ok(());
        };
        report.backtest_id = Some(backtest_id.clone());

        let mut polls = 0;
        while !snapshot.is_finished() && polls < self.poll.backtest_attempts {
            polls += 1;
            tokio::time::sleep(self.poll.backtest_interval).await;
            let args = json!({"projectId": project.value(), "backtestId": backtest_id});
            if let Some(raw) = self.call(READ_BACKTEST, args, report).await? {
                snapshot = snapshot_backtest(&raw);
            }
            debug!("Backtest {} status: {}", backtest_id, snapshot.status);
        }

        if !snapshot.is_finished() {
            report.note(format!(
                "backtest {} did not finish after {} checks (last status: {})",
                backtest_id, polls, snapshot.status
            ));
            return Ok(());
        }

        if let Some(error) = snapshot.error_message() {
            info!("Backtest {} failed at runtime", backtest_id);
            report.runtime_error = Some(error);
            report.stacktrace = snapshot.stacktrace;
            return Ok(());
        }

        report.backtest_ok = true;
        report.trades = match snapshot.trades {
            Some(trades) => trades,
            None if available.contains(READ_BACKTEST_ORDERS) => {
                let args = json!({
                    "projectId": project.value(),
                    "backtestId": backtest_id,
                    "start": 0,
                    "end": 100,
                });
                self.call(READ_BACKTEST_ORDERS, args, report)
                    .await?
                    .and_then(|raw| parse_payload(&raw))
                    .and_then(|v| order_count(&v))
                    .unwrap_or(0)
            }
            None => 0,
        };
        info!("Backtest {} completed with {} trades", backtest_id, report.trades);
        Ok(())
    }
}

#[async_trait]
impl StrategyExecutor for QcExecutor {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecReport, ExecutorError> {
        let available = self.available_tools().await?;
        let mut report = ExecReport::new(&request.project_name);

        let Some(project) = self.resolve_project(request, available, &mut report).await? else {
            return Ok(report);
        };
        report.project_id = Some(project);

        if !self.upload(request, project, available, &mut report).await? {
            return Ok(report);
        }
        info!(
            "Uploaded {} ({} lines) to project {}",
            request.file_name,
            request.code.line_count(),
            project
        );

        let Some(compile_id) = self.compile(project, &mut report).await? else {
            return Ok(report);
        };

        self.backtest(request, project, &compile_id, available, &mut report)
            .await?;
        Ok(report)
    }
}

fn snapshot_compile(raw: &str) -> CompileSnapshot {
    match parse_payload(raw) {
        Some(value) => CompileSnapshot::from_value(&value),
        None => CompileSnapshot {
            compile_id: None,
            state: CompileState::Other(preview(raw)),
            errors: Vec::new(),
        },
    }
}

fn snapshot_backtest(raw: &str) -> BacktestSnapshot {
    parse_payload(raw)
        .map(|value| BacktestSnapshot::from_value(&value))
        .unwrap_or_default()
}

fn preview(raw: &str) -> String {
    qcforge_domain::core::string::truncate(raw.trim(), 200)
}

fn to_executor_error(err: ToolPortError) -> ExecutorError {
    match err {
        ToolPortError::Transport(msg) => ExecutorError::Transport(msg),
        other => ExecutorError::Unavailable(other.to_string()),
    }
}
