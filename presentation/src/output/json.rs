//! JSON output for `--output json`

use crate::output::formatter::OutputFormatter;
use qcforge_application::{ListToolsOutput, RunAgentOutput};
use qcforge_domain::{Conversation, PipelineOutcome};
use serde::Serialize;

/// Renders results as pretty-printed JSON
pub struct JsonFormatter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentView<'a> {
    final_text: &'a str,
    turns: usize,
    tool_calls: usize,
    completed: bool,
    tools: &'a [String],
    history: &'a Conversation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolView<'a> {
    name: &'a str,
    description: &'a str,
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_schema: Option<&'a serde_json::Value>,
}

#[derive(Serialize)]
struct ToolsView<'a> {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    tools: Vec<ToolView<'a>>,
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

impl OutputFormatter for JsonFormatter {
    fn format_outcome(&self, outcome: &PipelineOutcome) -> String {
        pretty(outcome)
    }

    fn format_agent(&self, output: &RunAgentOutput) -> String {
        pretty(&AgentView {
            final_text: &output.final_text,
            turns: output.turns,
            tool_calls: output.tool_calls,
            completed: output.completed,
            tools: &output.tools,
            history: &output.history,
        })
    }

    fn format_tools(&self, output: &ListToolsOutput) -> String {
        let show_schemas = output.show_schemas();
        pretty(&ToolsView {
            total: output.total,
            filter: output.filter.as_deref(),
            tools: output
                .tools
                .iter()
                .map(|tool| ToolView {
                    name: &tool.definition.name,
                    description: &tool.definition.description,
                    allowed: tool.allowed,
                    input_schema: show_schemas.then_some(&tool.definition.input_schema),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcforge_application::ListedTool;
    use qcforge_domain::{AgentRole, ExecReport, Exchange, PipelineStatus, StrategyCode, ToolDefinition};
    use serde_json::Value;

    #[test]
    fn test_outcome_json_fields() {
        let mut history = Conversation::new();
        history.record(Exchange::new(AgentRole::Spec, "task", "- Hypothesis"));
        let mut report = ExecReport::new("SPX_0DTE_Strategy");
        report.compile_ok = true;
        report.backtest_ok = true;
        report.trades = 7;

        let outcome = PipelineOutcome {
            status: PipelineStatus::Succeeded,
            attempts: 1,
            max_attempts: 3,
            revisions: 0,
            spec: "- Hypothesis".to_string(),
            code: StrategyCode::new("class A(QCAlgorithm): pass").unwrap(),
            report: Some(report),
            history,
        };

        let json: Value = serde_json::from_str(&JsonFormatter.format_outcome(&outcome)).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["attempts"], 1);
        assert_eq!(json["report"]["compileOk"], true);
        assert_eq!(json["report"]["trades"], 7);
        assert_eq!(json["code"], "class A(QCAlgorithm): pass");
    }

    #[test]
    fn test_agent_json() {
        let output = RunAgentOutput {
            final_text: "Section A".to_string(),
            turns: 4,
            tool_calls: 6,
            completed: true,
            tools: vec!["create_compile".to_string()],
            history: Conversation::new(),
        };
        let json: Value = serde_json::from_str(&JsonFormatter.format_agent(&output)).unwrap();
        assert_eq!(json["finalText"], "Section A");
        assert_eq!(json["toolCalls"], 6);
        assert_eq!(json["tools"][0], "create_compile");
    }

    #[test]
    fn test_tools_json_schema_only_when_filtered() {
        let listed = ListedTool {
            definition: ToolDefinition::new("read_backtest", "Read a backtest."),
            allowed: true,
        };
        let unfiltered = ListToolsOutput {
            tools: vec![listed.clone()],
            total: 1,
            filter: None,
        };
        let json: Value = serde_json::from_str(&JsonFormatter.format_tools(&unfiltered)).unwrap();
        assert!(json["tools"][0].get("inputSchema").is_none());
        assert!(json.get("filter").is_none());

        let filtered = ListToolsOutput {
            filter: Some("backtest".to_string()),
            ..unfiltered
        };
        let json: Value = serde_json::from_str(&JsonFormatter.format_tools(&filtered)).unwrap();
        assert_eq!(json["tools"][0]["inputSchema"]["type"], "object");
        assert_eq!(json["filter"], "backtest");
    }
}
