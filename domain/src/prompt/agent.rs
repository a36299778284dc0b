//! Prompt templates for single-agent mode

use crate::prompt::template::QC_API_REFERENCE;
use crate::tool::entities::ToolDefinition;

/// Templates for the tool-driving controller agent
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System prompt for the controller, listing the tools it may call
    pub fn controller_system(tools: &[ToolDefinition], max_compile_attempts: usize) -> String {
        let tool_list = if tools.is_empty() {
            "(no QuantConnect tools available)".to_string()
        } else {
            tools
                .iter()
                .map(|t| format!("- {}: {}", t.name, t.summary()))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"You are a QuantConnect strategy controller. You work in two phases.

PHASE 1 (no tools, no code)
Write a verbal strategy specification as bullets:
- Hypothesis
- Instruments and data
- Entry conditions
- Exit conditions
- Position sizing
- Risk management
- Schedule
- Constraints (minimum credit, delta selection, wing width, VIX filter)
- Failure modes and mitigations

PHASE 2 (code and tools)
Implement the strategy as one complete QuantConnect Python algorithm, then use the tools to
create or update the project file, compile, backtest and read the results. Do not wait for
confirmation between tool calls.

If compilation fails, or read_backtest shows errors or 0 trades, revise the code and repeat
update_file_contents → create_compile → read_compile → create_backtest → read_backtest,
up to {} compile attempts.

Available tools:
{}

Rules:
- Produce the specification and the complete code before the first tool call.
- Keep track of projectId, compileId and backtestId.
- Stop once you have backtest results or cannot make progress.

{}

Final answer:
- Section A: strategy specification
- Section B: final code in a single ```python block
- Section C: tool summary (projectId, compileId, backtestId, outcome)"#,
            max_compile_attempts,
            tool_list,
            QC_API_REFERENCE.trim()
        )
    }

    /// User message that starts an agent run
    pub fn agent_prompt(task: &str) -> String {
        format!(
            r#"{}

Trade SPX index options with 0DTE expiry, enter daily, and include risk management and exit logic.
Follow the QuantConnect API and 0DTE rules strictly."#,
            task.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_lists_tools() {
        let tools = vec![
            ToolDefinition::new("create_project", "Create a project.\nMore text."),
            ToolDefinition::new("read_backtest", "Read a backtest."),
        ];
        let prompt = AgentPromptTemplate::controller_system(&tools, 3);
        assert!(prompt.contains("- create_project: Create a project."));
        assert!(!prompt.contains("More text."));
        assert!(prompt.contains("up to 3 compile attempts"));
    }

    #[test]
    fn test_controller_without_tools() {
        let prompt = AgentPromptTemplate::controller_system(&[], 1);
        assert!(prompt.contains("no QuantConnect tools available"));
    }

    #[test]
    fn test_agent_prompt_includes_task() {
        let prompt = AgentPromptTemplate::agent_prompt("  Iron condor at 10 AM  ");
        assert!(prompt.starts_with("Iron condor at 10 AM"));
    }
}
