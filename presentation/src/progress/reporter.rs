//! Progress reporting for pipeline and agent runs
//!
//! Everything here writes to stderr so that `--output json` keeps stdout
//! machine-readable.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use qcforge_application::{PipelinePhase, PipelineProgress};
use qcforge_domain::{ExecReport, PipelineStatus};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a spinner per phase
pub struct ProgressReporter {
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            phase_bar: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn spinner(prefix: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(prefix);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Print a line above the active spinner
    fn println(&self, line: String) {
        match self.phase_bar.lock().ok().and_then(|guard| guard.clone()) {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgress for ProgressReporter {
    fn on_phase_start(&self, phase: &PipelinePhase) {
        let pb = Self::spinner(phase.label());
        if let Ok(mut guard) = self.phase_bar.lock()
            && let Some(previous) = guard.replace(pb)
        {
            previous.finish_and_clear();
        }
    }

    fn on_phase_complete(&self, phase: &PipelinePhase, success: bool) {
        let bar = self.phase_bar.lock().ok().and_then(|mut guard| guard.take());
        let mark = if success { "v".green() } else { "x".red() };
        match bar {
            Some(pb) => {
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb.finish_with_message(format!("{} {}", mark, phase.label()));
            }
            None => eprintln!("{} {}", mark, phase.label()),
        }
    }

    fn on_exec_report(&self, attempt: usize, report: &ExecReport) {
        self.println(exec_report_line(attempt, report));
    }

    fn on_warning(&self, message: &str) {
        self.println(format!("  {} {}", "!".yellow(), message.yellow()));
    }

    fn on_finished(&self, status: PipelineStatus) {
        if let Ok(mut guard) = self.phase_bar.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_and_clear();
        }
        eprintln!("{}", status_line(status));
    }

    fn on_agent_turn(&self, turn: usize, max_turns: usize) {
        let Ok(mut guard) = self.phase_bar.lock() else {
            return;
        };
        let pb = guard.get_or_insert_with(|| Self::spinner("Agent".to_string()));
        pb.set_message(format!("turn {}/{}", turn, max_turns));
    }

    fn on_tool_call(&self, name: &str, success: bool) {
        self.println(tool_call_line(name, success));
    }
}

/// Simple text-based progress (no spinners)
pub struct SimpleProgress;

impl PipelineProgress for SimpleProgress {
    fn on_phase_start(&self, phase: &PipelinePhase) {
        eprintln!("{} {}", "->".cyan(), phase.label().bold());
    }

    fn on_phase_complete(&self, phase: &PipelinePhase, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), phase.label());
        } else {
            eprintln!("  {} {} (failed)", "x".red(), phase.label());
        }
    }

    fn on_exec_report(&self, attempt: usize, report: &ExecReport) {
        eprintln!("{}", exec_report_line(attempt, report));
    }

    fn on_warning(&self, message: &str) {
        eprintln!("  {} {}", "!".yellow(), message);
    }

    fn on_finished(&self, status: PipelineStatus) {
        eprintln!("{}", status_line(status));
    }

    fn on_agent_turn(&self, turn: usize, max_turns: usize) {
        eprintln!("{} Agent turn {}/{}", "->".cyan(), turn, max_turns);
    }

    fn on_tool_call(&self, name: &str, success: bool) {
        eprintln!("{}", tool_call_line(name, success));
    }
}

fn exec_report_line(attempt: usize, report: &ExecReport) -> String {
    let mark = if report.is_success() {
        "v".green()
    } else {
        "x".red()
    };
    format!("  {} attempt {}: {}", mark, attempt, report.summary())
}

fn tool_call_line(name: &str, success: bool) -> String {
    if success {
        format!("  {} {}", "v".green(), name.dimmed())
    } else {
        format!("  {} {} (failed)", "x".red(), name)
    }
}

fn status_line(status: PipelineStatus) -> String {
    if status.is_success() {
        format!("{} {}", "Done:".green().bold(), status.description())
    } else {
        format!("{} {}", "Stopped:".yellow().bold(), status.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_report_line_uses_summary() {
        colored::control::set_override(false);
        let mut report = ExecReport::new("SPX_0DTE_Strategy");
        report.compile_ok = true;
        report.backtest_ok = true;
        report.trades = 12;
        assert_eq!(exec_report_line(2, &report), "  v attempt 2: success (12 trades)");
    }

    #[test]
    fn test_status_line_wording() {
        colored::control::set_override(false);
        assert!(status_line(PipelineStatus::Succeeded).starts_with("Done:"));
        assert!(status_line(PipelineStatus::RepeatedErrors).starts_with("Stopped:"));
    }

    #[test]
    fn test_failed_tool_call_line() {
        colored::control::set_override(false);
        assert_eq!(tool_call_line("create_compile", false), "  x create_compile (failed)");
    }
}
