//! Final result of a pipeline run

use crate::session::entities::Conversation;
use crate::strategy::entities::StrategyCode;
use crate::strategy::report::ExecReport;
use serde::Serialize;

/// How the revision loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Compiled, backtested and traded
    Succeeded,
    /// Every allowed execution was used without success
    AttemptsExhausted,
    /// The revision budget ran out before a successful run
    RevisionLimitReached,
    /// The same compile errors came back after a fix
    RepeatedErrors,
}

impl PipelineStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineStatus::Succeeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Succeeded => "succeeded",
            PipelineStatus::AttemptsExhausted => "attempts_exhausted",
            PipelineStatus::RevisionLimitReached => "revision_limit_reached",
            PipelineStatus::RepeatedErrors => "repeated_errors",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PipelineStatus::Succeeded => "Strategy compiled, backtested and placed trades",
            PipelineStatus::AttemptsExhausted => "Attempt budget exhausted without a clean run",
            PipelineStatus::RevisionLimitReached => "Revision budget exhausted",
            PipelineStatus::RepeatedErrors => "Stopped after the same compile errors repeated",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub status: PipelineStatus,
    /// Executions performed
    pub attempts: usize,
    pub max_attempts: usize,
    /// Accepted code revisions
    pub revisions: usize,
    /// Strategy specification written by the spec agent
    pub spec: String,
    /// Last code that was executed
    pub code: StrategyCode,
    /// Report from the last execution
    pub report: Option<ExecReport>,
    pub history: Conversation,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert!(PipelineStatus::Succeeded.is_success());
        assert!(!PipelineStatus::RepeatedErrors.is_success());
        assert_eq!(
            serde_json::to_string(&PipelineStatus::RevisionLimitReached).unwrap(),
            "\"revision_limit_reached\""
        );
        assert_eq!(PipelineStatus::AttemptsExhausted.to_string(), "attempts_exhausted");
    }
}
