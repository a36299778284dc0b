//! Progress notification port
//!
//! Defines the interface for reporting progress during a pipeline or agent run.

use qcforge_domain::{ExecReport, PipelineStatus};

/// Stage of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Spec agent writes the strategy specification
    Spec,
    /// Code agent writes the first implementation
    Code,
    /// Execution on QuantConnect
    Execute { attempt: usize, max_attempts: usize },
    /// Code agent revises after a failure
    Revise { revision: usize },
}

impl PipelinePhase {
    pub fn label(&self) -> String {
        match self {
            PipelinePhase::Spec => "Writing strategy spec".to_string(),
            PipelinePhase::Code => "Generating code".to_string(),
            PipelinePhase::Execute {
                attempt,
                max_attempts,
            } => format!("Executing on QuantConnect (attempt {}/{})", attempt, max_attempts),
            PipelinePhase::Revise { revision } => format!("Revising code (revision {})", revision),
        }
    }
}

/// Callback for progress updates during a run
///
/// Implementations live in the presentation layer and can display
/// progress in various ways.
pub trait PipelineProgress: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: &PipelinePhase);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: &PipelinePhase, success: bool);

    /// Called after each execution with its report
    fn on_exec_report(&self, _attempt: usize, _report: &ExecReport) {}

    /// Called for recoverable problems that do not end the run
    fn on_warning(&self, _message: &str) {}

    /// Called when the loop ends
    fn on_finished(&self, _status: PipelineStatus) {}

    // ==================== Agent Mode Callbacks ====================

    /// Called when the agent starts a model turn
    fn on_agent_turn(&self, _turn: usize, _max_turns: usize) {}

    /// Called when the agent runs a tool
    fn on_tool_call(&self, _name: &str, _success: bool) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn on_phase_start(&self, _phase: &PipelinePhase) {}
    fn on_phase_complete(&self, _phase: &PipelinePhase, _success: bool) {}
}
