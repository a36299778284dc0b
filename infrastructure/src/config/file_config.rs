//! Raw TOML configuration data types
//!
//! These structs mirror the config file. Environment keys and CLI overrides
//! are merged into the same shape before extraction, so every source feeds
//! the same fields.

use crate::anthropic::client::{AnthropicSettings, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS};
use crate::mcp::client::McpTimeouts;
use crate::mcp::launcher::{DEFAULT_MCP_IMAGE, DockerLaunch};
use qcforge_application::{AgentParams, PipelineParams};
use qcforge_domain::{Credentials, DomainError, Model, OutputFormat, StrategyTask};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const REDACTED: &str = "<redacted>";

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("pipeline.max_attempts cannot be 0")]
    ZeroAttempts,

    #[error("agent.max_turns cannot be 0")]
    ZeroAgentTurns,

    #[error("agent.timeout_secs cannot be 0")]
    ZeroAgentTimeout,

    #[error("quantconnect.project_name cannot be empty")]
    EmptyProjectName,

    #[error("quantconnect.file_name cannot be empty")]
    EmptyFileName,
}

/// QuantConnect account and MCP server settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQuantConnectConfig {
    pub user_id: Option<String>,
    pub api_token: Option<String>,
    pub project_name: String,
    pub file_name: String,
    pub mcp_image: String,
    pub docker_platform: Option<String>,
    pub init_timeout_secs: u64,
    pub tool_timeout_secs: u64,
}

impl Default for FileQuantConnectConfig {
    fn default() -> Self {
        let params = PipelineParams::default();
        Self {
            user_id: None,
            api_token: None,
            project_name: params.project_name,
            file_name: params.file_name,
            mcp_image: DEFAULT_MCP_IMAGE.to_string(),
            docker_platform: None,
            init_timeout_secs: 30,
            tool_timeout_secs: 120,
        }
    }
}

impl std::fmt::Debug for FileQuantConnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileQuantConnectConfig")
            .field("user_id", &self.user_id)
            .field("api_token", &self.api_token.as_ref().map(|_| REDACTED))
            .field("project_name", &self.project_name)
            .field("file_name", &self.file_name)
            .field("mcp_image", &self.mcp_image)
            .field("docker_platform", &self.docker_platform)
            .finish_non_exhaustive()
    }
}

/// Anthropic API settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnthropicConfig {
    pub api_key: Option<String>,
    pub model: Model,
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for FileAnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Model::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl std::fmt::Debug for FileAnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAnthropicConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Revision loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Strategy request; the built-in SPX 0DTE task when unset
    pub task: Option<String>,
    pub max_attempts: usize,
    pub max_revisions: usize,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let params = PipelineParams::default();
        Self {
            task: None,
            max_attempts: params.max_attempts,
            max_revisions: params.max_revisions,
        }
    }
}

/// Single-agent mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub max_turns: usize,
    pub timeout_secs: u64,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        let params = AgentParams::default();
        Self {
            max_turns: params.max_turns,
            timeout_secs: params.timeout.as_secs(),
        }
    }
}

/// Raw output configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
    /// JSONL transcript path
    pub transcript: Option<PathBuf>,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
            transcript: None,
        }
    }
}

/// Complete configuration after merging all sources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub quantconnect: FileQuantConnectConfig,
    pub anthropic: FileAnthropicConfig,
    pub pipeline: FilePipelineConfig,
    pub agent: FileAgentConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Check values no source should be allowed to set
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.pipeline.max_attempts == 0 {
            return Err(ConfigValidationError::ZeroAttempts);
        }
        if self.agent.max_turns == 0 {
            return Err(ConfigValidationError::ZeroAgentTurns);
        }
        if self.agent.timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroAgentTimeout);
        }
        if self.quantconnect.project_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyProjectName);
        }
        if self.quantconnect.file_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyFileName);
        }
        Ok(())
    }

    /// All three credentials, or the name of the first missing one
    pub fn credentials(&self) -> Result<Credentials, DomainError> {
        Credentials::new(
            self.quantconnect.user_id.clone().unwrap_or_default(),
            self.quantconnect.api_token.clone().unwrap_or_default(),
            self.anthropic.api_key.clone().unwrap_or_default(),
        )
    }

    /// Configured task, or the built-in one when unset or blank
    pub fn task(&self) -> StrategyTask {
        self.pipeline
            .task
            .as_deref()
            .and_then(|t| StrategyTask::new(t).ok())
            .unwrap_or_default()
    }

    pub fn model(&self) -> Model {
        self.anthropic.model.clone()
    }

    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams::default()
            .with_project_name(&self.quantconnect.project_name)
            .with_file_name(&self.quantconnect.file_name)
            .with_max_attempts(self.pipeline.max_attempts)
            .with_max_revisions(self.pipeline.max_revisions)
    }

    pub fn agent_params(&self) -> AgentParams {
        AgentParams::default()
            .with_max_turns(self.agent.max_turns)
            .with_timeout(Duration::from_secs(self.agent.timeout_secs))
            .with_max_compile_attempts(self.pipeline.max_attempts)
    }

    pub fn anthropic_settings(&self, credentials: &Credentials) -> AnthropicSettings {
        AnthropicSettings::new(credentials.model_api_key())
            .with_base_url(&self.anthropic.base_url)
            .with_max_tokens(self.anthropic.max_tokens)
    }

    pub fn docker_launch(&self, credentials: &Credentials) -> DockerLaunch {
        DockerLaunch::new(credentials)
            .with_image(&self.quantconnect.mcp_image)
            .with_platform(self.quantconnect.docker_platform.clone())
    }

    pub fn mcp_timeouts(&self) -> McpTimeouts {
        McpTimeouts {
            init: Duration::from_secs(self.quantconnect.init_timeout_secs),
            tool_call: Duration::from_secs(self.quantconnect.tool_timeout_secs),
        }
    }

    /// Effective configuration as TOML with secrets masked
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if shown.quantconnect.api_token.is_some() {
            shown.quantconnect.api_token = Some(REDACTED.to_string());
        }
        if shown.anthropic.api_key.is_some() {
            shown.anthropic.api_key = Some(REDACTED.to_string());
        }
        toml::to_string_pretty(&shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();
        assert_eq!(config.anthropic.model.as_str(), "claude-sonnet-4-20250514");
        assert_eq!(config.quantconnect.project_name, "SPX_0DTE_Strategy");
        assert_eq!(config.quantconnect.file_name, "main.py");
        assert_eq!(config.quantconnect.mcp_image, "quantconnect/mcp-server");
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.pipeline.max_revisions, 3);
        assert_eq!(config.agent.max_turns, 20);
        assert_eq!(config.agent.timeout_secs, 800);
        assert_eq!(config.anthropic.max_tokens, 8000);
        assert_eq!(config.mcp_timeouts().init, Duration::from_secs(30));
        assert_eq!(config.mcp_timeouts().tool_call, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: FileConfig = toml::from_str(
            r#"
[quantconnect]
project_name = "Iron_Condor"

[pipeline]
max_attempts = 5

[output]
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.quantconnect.project_name, "Iron_Condor");
        assert_eq!(config.quantconnect.file_name, "main.py");
        assert_eq!(config.pipeline.max_attempts, 5);
        assert_eq!(config.pipeline.max_revisions, 3);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = FileConfig::default();
        config.pipeline.max_attempts = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroAttempts));
    }

    #[test]
    fn test_missing_credential_named() {
        let mut config = FileConfig::default();
        config.quantconnect.user_id = Some("1".into());
        config.quantconnect.api_token = Some("t".into());
        assert_eq!(
            config.credentials().unwrap_err(),
            DomainError::MissingCredential("ANTHROPIC_API_KEY")
        );
    }

    #[test]
    fn test_blank_task_uses_default() {
        let mut config = FileConfig::default();
        config.pipeline.task = Some("   ".into());
        assert_eq!(config.task(), StrategyTask::default());
        config.pipeline.task = Some("Sell iron condors".into());
        assert_eq!(config.task().content(), "Sell iron condors");
    }

    #[test]
    fn test_redacted_output_hides_secrets() {
        let mut config = FileConfig::default();
        config.quantconnect.api_token = Some("qc-secret".into());
        config.anthropic.api_key = Some("sk-ant-secret".into());

        let shown = config.to_redacted_toml().unwrap();
        assert!(!shown.contains("qc-secret"));
        assert!(!shown.contains("sk-ant-secret"));
        assert!(shown.contains(REDACTED));
        assert!(!format!("{:?}", config).contains("sk-ant-secret"));
    }

    #[test]
    fn test_params_follow_config() {
        let mut config = FileConfig::default();
        config.pipeline.max_attempts = 4;
        config.agent.timeout_secs = 60;
        let params = config.pipeline_params();
        assert_eq!(params.max_attempts, 4);
        let agent = config.agent_params();
        assert_eq!(agent.timeout, Duration::from_secs(60));
        assert_eq!(agent.max_compile_attempts, 4);
    }
}
