//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use qcforge_domain::OutputFormat;
use std::path::PathBuf;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Human-readable summary
    Text,
    /// JSON on stdout
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// What to run
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate, execute and revise a strategy (the default)
    Run,
    /// Let a single tool-using agent drive QuantConnect
    Agent {
        /// Strategy request (defaults to the configured task)
        message: Option<String>,
    },
    /// List the tools the QuantConnect MCP server exposes
    Tools {
        /// Keep tools whose name or description contains this text
        filter: Option<String>,
    },
}

/// CLI arguments for qcforge
#[derive(Parser, Debug)]
#[command(name = "qcforge")]
#[command(author, version, about = "Generate and debug QuantConnect strategies with an LLM")]
#[command(long_about = r#"
qcforge asks an LLM for a QuantConnect strategy, runs it through the
QuantConnect MCP server and feeds compile and runtime errors back until the
backtest places trades or the budget runs out.

The run has three stages:
1. Spec: the model writes a verbal strategy specification
2. Code: the model implements it as a Python algorithm
3. Execute: the code is uploaded, compiled and backtested; failures are revised

Configuration is merged from (lowest to highest priority):
1. Built-in defaults
2. ./qcforge.toml or ~/.config/qcforge/config.toml (or --config <path>)
3. ./.env (or --env-file <path>)
4. Process environment
5. Command-line flags

Example:
  qcforge
  qcforge --task "Iron condor at 10:00 with a VIX filter" --max-attempts 5
  qcforge agent "Short put spread, exit at 50% profit"
  qcforge tools backtest
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Strategy request sent to the spec agent
    #[arg(long, global = true, value_name = "TEXT")]
    pub task: Option<String>,

    /// QuantConnect project to create or reuse
    #[arg(long, global = true, value_name = "NAME")]
    pub project: Option<String>,

    /// Anthropic model id or alias (sonnet, opus, haiku)
    #[arg(short, long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Maximum executions against QuantConnect
    #[arg(long, global = true, value_name = "N")]
    pub max_attempts: Option<usize>,

    /// Maximum accepted code revisions
    #[arg(long, global = true, value_name = "N")]
    pub max_revisions: Option<usize>,

    /// Path to a .env file
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration sources and the merged configuration, then exit
    #[arg(long, global = true)]
    pub show_config: bool,

    /// Append a JSONL transcript of the run to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormatArg>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// The subcommand to run; a bare `qcforge` runs the pipeline
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// Output format requested on the command line, if any
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output.map(OutputFormat::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_runs_pipeline() {
        let cli = Cli::try_parse_from(["qcforge"]).unwrap();
        assert_eq!(cli.command(), Command::Run);
        assert_eq!(cli.verbose, 0);
        assert!(cli.output_format().is_none());
    }

    #[test]
    fn test_pipeline_flags() {
        let cli = Cli::try_parse_from([
            "qcforge",
            "--task",
            "Iron condor",
            "--project",
            "Condor",
            "--max-attempts",
            "5",
            "--max-revisions",
            "2",
            "--output",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.task.as_deref(), Some("Iron condor"));
        assert_eq!(cli.project.as_deref(), Some("Condor"));
        assert_eq!(cli.max_attempts, Some(5));
        assert_eq!(cli.max_revisions, Some(2));
        assert_eq!(cli.output_format(), Some(OutputFormat::Json));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_agent_subcommand_with_global_flags() {
        let cli = Cli::try_parse_from(["qcforge", "agent", "Short put spread", "-q", "--model", "opus"])
            .unwrap();
        assert_eq!(
            cli.command(),
            Command::Agent {
                message: Some("Short put spread".to_string())
            }
        );
        assert!(cli.quiet);
        assert_eq!(cli.model.as_deref(), Some("opus"));
    }

    #[test]
    fn test_tools_subcommand() {
        let cli = Cli::try_parse_from(["qcforge", "tools", "backtest"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::Tools {
                filter: Some("backtest".to_string())
            }
        );

        let cli = Cli::try_parse_from(["qcforge", "tools"]).unwrap();
        assert_eq!(cli.command(), Command::Tools { filter: None });
    }

    #[test]
    fn test_rejects_non_numeric_budget() {
        assert!(Cli::try_parse_from(["qcforge", "--max-attempts", "many"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["qcforge", "--output", "yaml"]).is_err());
    }
}
