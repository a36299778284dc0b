//! Strategy executor port
//!
//! Runs strategy code on QuantConnect and reports what happened.

use async_trait::async_trait;
use qcforge_domain::{ExecReport, ProjectId, StrategyCode};
use thiserror::Error;

/// Errors that stop execution altogether.
///
/// Anything the strategy itself caused (build errors, crashes, no trades,
/// failed tool calls) is recorded in the [`ExecReport`] instead.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// QuantConnect rejected the configured credentials
    #[error("QuantConnect authentication failed: {0}")]
    Authentication(String),

    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("Executor unavailable: {0}")]
    Unavailable(String),
}

/// One execution request
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub project_name: String,
    pub file_name: String,
    /// Known project from an earlier attempt
    pub project_id: Option<ProjectId>,
    pub code: StrategyCode,
    /// 1-based attempt number, used to name the backtest
    pub attempt: usize,
}

impl ExecRequest {
    pub fn new(project_name: impl Into<String>, file_name: impl Into<String>, code: StrategyCode) -> Self {
        Self {
            project_name: project_name.into(),
            file_name: file_name.into(),
            project_id: None,
            code,
            attempt: 1,
        }
    }

    pub fn with_project_id(mut self, project_id: Option<ProjectId>) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn with_attempt(mut self, attempt: usize) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn backtest_name(&self) -> String {
        format!("{} attempt {}", self.project_name, self.attempt)
    }
}

/// Port for executing strategies
#[async_trait]
pub trait StrategyExecutor: Send + Sync {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecReport, ExecutorError>;
}
