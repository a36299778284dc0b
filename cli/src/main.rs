//! CLI entrypoint for qcforge
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result};
use clap::Parser;
use qcforge_application::{
    ConversationLogger, ListToolsUseCase, LlmGateway, McpToolPort, NoProgress, PipelineProgress,
    RunAgentInput, RunAgentUseCase, RunPipelineInput, RunPipelineUseCase,
};
use qcforge_domain::Model;
use qcforge_infrastructure::{
    AnthropicGateway, ConfigFileSource, ConfigLoader, ConfigOverrides, ConfigSources,
    EnvFileSource, FileConfig, JsonlConversationLogger, McpClient, QcExecutor,
};
use qcforge_presentation::{Cli, Command, ProgressReporter, SimpleProgress, formatter_for};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines reach the file
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting qcforge");

    let sources = ConfigSources::from_process(config_file_source(&cli), env_file_source(&cli));
    let config = ConfigLoader::load(&sources, &overrides(&cli))?;

    if cli.show_config {
        ConfigLoader::print_config_sources(&sources);
        println!();
        println!("{}", config.to_redacted_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    if !config.output.color {
        colored::control::set_override(false);
    }

    let succeeded = run(&cli, &config).await?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Wire the adapters and run the selected command.
///
/// Returns whether the command reached its goal; everything it spawned is
/// dropped (and the MCP container stopped) before the exit code is set.
async fn run(cli: &Cli, config: &FileConfig) -> Result<bool> {
    let credentials = config.credentials()?;
    let formatter = formatter_for(config.output.format);
    let progress = progress_for(cli);

    // === Dependency Injection ===
    let mcp = McpClient::spawn(&config.docker_launch(&credentials), config.mcp_timeouts())
        .await
        .context("failed to start the QuantConnect MCP server")?;
    let tools: Arc<dyn McpToolPort> = Arc::new(mcp);

    let command = cli.command();
    if let Command::Tools { filter } = &command {
        let output = ListToolsUseCase::new(tools).execute(filter.as_deref()).await?;
        println!("{}", formatter.format_tools(&output));
        return Ok(true);
    }

    let gateway: Arc<dyn LlmGateway> =
        Arc::new(AnthropicGateway::new(config.anthropic_settings(&credentials))?);
    let transcript = open_transcript(config.output.transcript.as_deref())?;

    match command {
        Command::Agent { message } => {
            let message = message.unwrap_or_else(|| config.task().content().to_string());
            let input = RunAgentInput::new(message, config.model()).with_params(config.agent_params());

            let mut use_case = RunAgentUseCase::new(gateway, tools);
            if let Some(logger) = transcript {
                use_case = use_case.with_conversation_logger(logger);
            }

            let output = use_case.execute_with_progress(input, progress.as_ref()).await?;
            println!("{}", formatter.format_agent(&output));
            Ok(output.completed)
        }
        _ => {
            let input = RunPipelineInput::new(config.task(), config.model())
                .with_params(config.pipeline_params());
            let executor = Arc::new(QcExecutor::new(tools));

            let mut use_case = RunPipelineUseCase::new(gateway, executor);
            if let Some(logger) = transcript {
                use_case = use_case.with_conversation_logger(logger);
            }

            let outcome = use_case.execute_with_progress(input, progress.as_ref()).await?;
            println!("{}", formatter.format_outcome(&outcome));
            Ok(outcome.is_success())
        }
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Initialize logging based on verbosity level
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("invalid log file path: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn config_file_source(cli: &Cli) -> ConfigFileSource {
    match (&cli.config, cli.no_config) {
        (_, true) => ConfigFileSource::Disabled,
        (Some(path), false) => ConfigFileSource::Explicit(path.clone()),
        (None, false) => ConfigFileSource::Discover,
    }
}

fn env_file_source(cli: &Cli) -> EnvFileSource {
    match &cli.env_file {
        Some(path) => EnvFileSource::Explicit(path.clone()),
        None => EnvFileSource::Default,
    }
}

/// Command-line values, which beat every other configuration source
fn overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::default();
    overrides.quantconnect.project_name = cli.project.clone();
    overrides.anthropic.model = cli.model.as_deref().map(|m| match m.parse::<Model>() {
        Ok(model) => model,
        Err(never) => match never {},
    });
    overrides.pipeline.task = cli.task.clone();
    overrides.pipeline.max_attempts = cli.max_attempts;
    overrides.pipeline.max_revisions = cli.max_revisions;
    overrides.output.format = cli.output_format();
    overrides.output.transcript = cli.transcript.clone();
    overrides
}

fn progress_for(cli: &Cli) -> Box<dyn PipelineProgress> {
    if cli.quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    }
}

fn open_transcript(path: Option<&Path>) -> Result<Option<Arc<dyn ConversationLogger>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let logger = JsonlConversationLogger::open(path)
        .with_context(|| format!("failed to open transcript {}", path.display()))?;
    info!("Writing transcript to {}", logger.path().display());
    Ok(Some(Arc::new(logger)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_config_wins_over_explicit_path() {
        let cli = Cli::parse_from(["qcforge", "--config", "a.toml", "--no-config"]);
        assert!(matches!(config_file_source(&cli), ConfigFileSource::Disabled));
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::parse_from([
            "qcforge",
            "--project",
            "Condor",
            "--model",
            "opus",
            "--max-attempts",
            "4",
            "--output",
            "json",
        ]);
        let overrides = overrides(&cli);
        assert_eq!(overrides.quantconnect.project_name.as_deref(), Some("Condor"));
        assert_eq!(overrides.anthropic.model, Some(Model::ClaudeOpus45));
        assert_eq!(overrides.pipeline.max_attempts, Some(4));
        assert_eq!(overrides.pipeline.max_revisions, None);
        assert_eq!(overrides.output.format, Some(qcforge_domain::OutputFormat::Json));
    }

    #[test]
    fn test_overrides_applied_over_defaults() {
        let cli = Cli::parse_from(["qcforge", "--max-revisions", "7", "--task", "Iron condor"]);
        let sources = ConfigSources {
            config_file: ConfigFileSource::Disabled,
            env_file: EnvFileSource::Disabled,
            process_env: vec![],
        };
        let config = ConfigLoader::load(&sources, &overrides(&cli)).unwrap();
        assert_eq!(config.pipeline_params().max_revisions, 7);
        assert_eq!(config.task().content(), "Iron condor");
    }
}
