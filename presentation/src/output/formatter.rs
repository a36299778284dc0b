//! Output formatter trait

use qcforge_application::{ListToolsOutput, RunAgentOutput};
use qcforge_domain::{OutputFormat, PipelineOutcome};

/// Trait for rendering run results
pub trait OutputFormatter {
    fn format_outcome(&self, outcome: &PipelineOutcome) -> String;

    fn format_agent(&self, output: &RunAgentOutput) -> String;

    fn format_tools(&self, output: &ListToolsOutput) -> String;
}

/// Formatter for the requested output format
pub fn formatter_for(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(crate::output::console::ConsoleFormatter),
        OutputFormat::Json => Box::new(crate::output::json::JsonFormatter),
    }
}
