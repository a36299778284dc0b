//! Execution report for one QuantConnect run

use crate::strategy::entities::ProjectId;
use serde::{Deserialize, Serialize};

/// Outcome of executing a strategy against QuantConnect
///
/// Strategy-level failures (compile errors, runtime errors, zero trades,
/// tool failures) are recorded here as data. They are fed back to the model
/// rather than aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecReport {
    pub project_name: String,
    pub project_id: Option<ProjectId>,
    pub compile_ok: bool,
    pub compile_id: Option<String>,
    #[serde(default)]
    pub compile_errors: Vec<String>,
    pub backtest_ok: bool,
    pub backtest_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
    pub trades: u64,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Why an execution did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecFailure {
    /// Project creation or upload failed before a compile was started
    Setup(String),
    /// The build finished with errors
    Compile(Vec<String>),
    /// The backtest ran and crashed
    Runtime {
        error: String,
        stacktrace: Option<String>,
    },
    /// The backtest never produced a result (creation failed or polling timed out)
    Incomplete(String),
    /// Compiled and backtested, but placed no trades
    NoTrades,
}

impl ExecReport {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Compiled, backtested and traded at least once
    pub fn is_success(&self) -> bool {
        self.compile_ok && self.backtest_ok && self.trades > 0
    }

    /// Classify the failure, or `None` on success
    pub fn failure(&self) -> Option<ExecFailure> {
        if self.is_success() {
            return None;
        }
        if !self.compile_ok {
            if self.compile_id.is_none() && self.compile_errors.is_empty() {
                return Some(ExecFailure::Setup(self.last_note()));
            }
            return Some(ExecFailure::Compile(self.compile_errors.clone()));
        }
        if !self.backtest_ok {
            return Some(match &self.runtime_error {
                Some(error) => ExecFailure::Runtime {
                    error: error.clone(),
                    stacktrace: self.stacktrace.clone(),
                },
                None => ExecFailure::Incomplete(self.last_note()),
            });
        }
        Some(ExecFailure::NoTrades)
    }

    /// Single-line status for progress output
    pub fn summary(&self) -> String {
        match self.failure() {
            None => format!("success ({} trades)", self.trades),
            Some(ExecFailure::Setup(reason)) => format!("setup failed: {}", reason),
            Some(ExecFailure::Compile(errors)) => {
                format!("compile failed ({} errors)", errors.len())
            }
            Some(ExecFailure::Runtime { error, .. }) => {
                format!("runtime error: {}", crate::core::string::truncate(&error, 120))
            }
            Some(ExecFailure::Incomplete(reason)) => format!("backtest incomplete: {}", reason),
            Some(ExecFailure::NoTrades) => "backtest completed with 0 trades".to_string(),
        }
    }

    fn last_note(&self) -> String {
        self.notes
            .last()
            .cloned()
            .unwrap_or_else(|| "no details".to_string())
    }
}
