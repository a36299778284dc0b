//! Console output formatter for run results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use qcforge_application::{ListToolsOutput, RunAgentOutput};
use qcforge_domain::{ExecReport, PipelineOutcome};

/// Formats results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a pipeline outcome
    pub fn format(outcome: &PipelineOutcome) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("QuantConnect Strategy Run"));
        output.push('\n');

        let status = if outcome.is_success() {
            outcome.status.description().green().bold()
        } else {
            outcome.status.description().red().bold()
        };
        output.push_str(&format!("{} {}\n", "Status:".cyan().bold(), status));
        output.push_str(&format!(
            "{} {}/{}   {} {}\n",
            "Attempts:".cyan().bold(),
            outcome.attempts,
            outcome.max_attempts,
            "Revisions:".cyan().bold(),
            outcome.revisions
        ));

        if let Some(report) = &outcome.report {
            output.push_str(&Self::section_header("Last Execution"));
            output.push_str(&Self::format_report(report));
        }

        output.push_str(&Self::section_header("Strategy Specification"));
        output.push_str(&format!("\n{}\n", outcome.spec.trim()));

        output.push_str(&Self::section_header(&format!(
            "Final Code ({} lines)",
            outcome.code.line_count()
        )));
        output.push_str(&format!("\n```python\n{}\n```\n", outcome.code.as_str()));

        output.push_str(&Self::footer());
        output
    }

    fn format_report(report: &ExecReport) -> String {
        let mut output = String::new();
        let yes_no = |ok: bool| if ok { "ok".green() } else { "failed".red() };

        output.push_str(&format!("\n  Project:   {}", report.project_name));
        if let Some(id) = &report.project_id {
            output.push_str(&format!(" (id {})", id.value()));
        }
        output.push('\n');
        output.push_str(&format!(
            "  Compile:   {}{}\n",
            yes_no(report.compile_ok),
            Self::id_suffix(report.compile_id.as_deref())
        ));
        output.push_str(&format!(
            "  Backtest:  {}{}\n",
            yes_no(report.backtest_ok),
            Self::id_suffix(report.backtest_id.as_deref())
        ));
        output.push_str(&format!("  Trades:    {}\n", report.trades));

        if !report.compile_errors.is_empty() {
            output.push_str(&format!("\n  {}\n", "Compile errors:".red().bold()));
            for error in &report.compile_errors {
                output.push_str(&format!("    * {}\n", error));
            }
        }
        if let Some(error) = &report.runtime_error {
            output.push_str(&format!("\n  {} {}\n", "Runtime error:".red().bold(), error));
            if let Some(trace) = &report.stacktrace {
                output.push_str(&Self::indent(trace, "    "));
                output.push('\n');
            }
        }
        if !report.notes.is_empty() {
            output.push_str(&format!("\n  {}\n", "Notes:".yellow().bold()));
            for note in &report.notes {
                output.push_str(&format!("    * {}\n", note));
            }
        }
        output
    }

    /// Format an agent run
    pub fn format_agent(output: &RunAgentOutput) -> String {
        let mut text = String::new();

        text.push_str(&Self::header("QuantConnect Agent"));
        text.push('\n');
        text.push_str(&format!(
            "{} {}   {} {}\n",
            "Turns:".cyan().bold(),
            output.turns,
            "Tool calls:".cyan().bold(),
            output.tool_calls
        ));
        if !output.completed {
            text.push_str(&format!("{}\n", "Turn budget exhausted".yellow().bold()));
        }

        text.push_str(&Self::section_header("Answer"));
        text.push_str(&format!("\n{}\n", output.final_text.trim()));
        text.push_str(&Self::footer());
        text
    }

    /// Format a tool listing; schemas are included for filtered listings
    pub fn format_tools(output: &ListToolsOutput) -> String {
        let mut text = String::new();

        let heading = match &output.filter {
            Some(filter) => format!(
                "{} of {} tools matching '{}'",
                output.tools.len(),
                output.total,
                filter
            ),
            None => format!("{} tools", output.total),
        };
        text.push_str(&format!("{}\n", heading.cyan().bold()));

        for tool in &output.tools {
            let mark = if tool.allowed {
                "*".green()
            } else {
                " ".normal()
            };
            text.push_str(&format!(
                "\n{} {}\n",
                mark,
                tool.definition.name.bold()
            ));
            let summary = tool.definition.summary();
            if !summary.is_empty() {
                text.push_str(&format!("    {}\n", summary));
            }
            if output.show_schemas() {
                let schema = serde_json::to_string_pretty(&tool.definition.input_schema)
                    .unwrap_or_else(|_| "{}".to_string());
                text.push_str(&Self::indent(&schema, "    "));
                text.push('\n');
            }
        }

        text.push_str(&format!("\n{}\n", "* = used by the pipeline".dimmed()));
        text
    }

    fn id_suffix(id: Option<&str>) -> String {
        id.map(|id| format!(" ({})", id)).unwrap_or_default()
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_outcome(&self, outcome: &PipelineOutcome) -> String {
        ConsoleFormatter::format(outcome)
    }

    fn format_agent(&self, output: &RunAgentOutput) -> String {
        ConsoleFormatter::format_agent(output)
    }

    fn format_tools(&self, output: &ListToolsOutput) -> String {
        ConsoleFormatter::format_tools(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcforge_application::ListedTool;
    use qcforge_domain::{Conversation, PipelineStatus, StrategyCode, ToolDefinition};

    fn outcome(report: ExecReport, status: PipelineStatus) -> PipelineOutcome {
        PipelineOutcome {
            status,
            attempts: 3,
            max_attempts: 3,
            revisions: 2,
            spec: "- Hypothesis: premium decays".to_string(),
            code: StrategyCode::new("class A(QCAlgorithm):\n    pass").unwrap(),
            report: Some(report),
            history: Conversation::new(),
        }
    }

    #[test]
    fn test_failed_outcome_lists_compile_errors() {
        colored::control::set_override(false);
        let mut report = ExecReport::new("SPX_0DTE_Strategy");
        report.compile_errors = vec!["Line 4: name 'spx' is not defined".to_string()];
        report.note("read_compile timed out");

        let text = ConsoleFormatter::format(&outcome(report, PipelineStatus::AttemptsExhausted));
        assert!(text.contains("Attempts: 3/3"));
        assert!(text.contains("* Line 4: name 'spx' is not defined"));
        assert!(text.contains("* read_compile timed out"));
        assert!(text.contains("Final Code (2 lines)"));
        assert!(text.contains("```python\nclass A(QCAlgorithm):"));
    }

    #[test]
    fn test_runtime_error_with_stacktrace() {
        colored::control::set_override(false);
        let mut report = ExecReport::new("SPX_0DTE_Strategy");
        report.compile_ok = true;
        report.compile_id = Some("c-1".to_string());
        report.runtime_error = Some("ZeroDivisionError".to_string());
        report.stacktrace = Some("at on_data\nline 10".to_string());

        let text = ConsoleFormatter::format(&outcome(report, PipelineStatus::RevisionLimitReached));
        assert!(text.contains("Compile:   ok (c-1)"));
        assert!(text.contains("Runtime error: ZeroDivisionError"));
        assert!(text.contains("    at on_data\n    line 10"));
    }

    #[test]
    fn test_agent_out_of_turns() {
        colored::control::set_override(false);
        let output = RunAgentOutput {
            final_text: "Max iterations reached".to_string(),
            turns: 20,
            tool_calls: 31,
            completed: false,
            tools: vec![],
            history: Conversation::new(),
        };
        let text = ConsoleFormatter::format_agent(&output);
        assert!(text.contains("Turns: 20"));
        assert!(text.contains("Turn budget exhausted"));
        assert!(text.contains("Max iterations reached"));
    }

    #[test]
    fn test_filtered_tools_show_schema() {
        colored::control::set_override(false);
        let definition = ToolDefinition::new("read_backtest", "Read a backtest.\nDetails.")
            .with_schema(serde_json::json!({"type": "object", "required": ["projectId"]}));
        let output = ListToolsOutput {
            tools: vec![ListedTool {
                definition,
                allowed: true,
            }],
            total: 40,
            filter: Some("backtest".to_string()),
        };
        let text = ConsoleFormatter::format_tools(&output);
        assert!(text.starts_with("1 of 40 tools matching 'backtest'"));
        assert!(text.contains("* read_backtest"));
        assert!(text.contains("    Read a backtest."));
        assert!(!text.contains("Details."));
        assert!(text.contains("\"projectId\""));
    }

    #[test]
    fn test_unfiltered_tools_hide_schema() {
        colored::control::set_override(false);
        let output = ListToolsOutput {
            tools: vec![ListedTool {
                definition: ToolDefinition::new("list_projects", "List projects."),
                allowed: false,
            }],
            total: 1,
            filter: None,
        };
        let text = ConsoleFormatter::format_tools(&output);
        assert!(text.starts_with("1 tools"));
        assert!(!text.contains("\"type\""));
    }
}
