//! Configuration loader with multi-source merging

use super::file_config::{ConfigValidationError, FileConfig};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use qcforge_domain::config::env_key::{ValueKind, known_env_keys, lookup_env_key};
use qcforge_domain::{DomainError, Model, OutputFormat};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Project-level config file names, checked in order
const PROJECT_CONFIG_FILES: [&str; 2] = ["qcforge.toml", ".qcforge.toml"];

/// Errors raised while assembling the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read env file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("missing credential {0}: set it in the environment, a .env file or the config file")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Invalid(#[from] ConfigValidationError),

    #[error(transparent)]
    Domain(DomainError),
}

impl From<DomainError> for ConfigError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::MissingCredential(name) => ConfigError::MissingCredential(name),
            other => ConfigError::Domain(other),
        }
    }
}

/// Where to look for the TOML config file
#[derive(Debug, Clone, Default)]
pub enum ConfigFileSource {
    /// Global XDG file, then `./qcforge.toml` / `./.qcforge.toml`
    #[default]
    Discover,
    /// Exactly this file (must exist)
    Explicit(PathBuf),
    /// `--no-config`
    Disabled,
}

/// Where to look for the `.env` file
#[derive(Debug, Clone, Default)]
pub enum EnvFileSource {
    /// `./.env` when present
    #[default]
    Default,
    /// Exactly this file (must exist)
    Explicit(PathBuf),
    Disabled,
}

/// Inputs to [`ConfigLoader::load`]
///
/// The process environment is passed in as pairs so tests stay hermetic.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub config_file: ConfigFileSource,
    pub env_file: EnvFileSource,
    pub process_env: Vec<(String, String)>,
}

impl ConfigSources {
    /// Sources for a real run: CLI choices plus the current environment.
    pub fn from_process(config_file: ConfigFileSource, env_file: EnvFileSource) -> Self {
        Self {
            config_file,
            env_file,
            process_env: std::env::vars()
                .filter(|(name, _)| lookup_env_key(name).is_some())
                .collect(),
        }
    }
}

/// Values set explicitly on the command line (highest priority)
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub quantconnect: QuantConnectOverrides,
    pub anthropic: AnthropicOverrides,
    pub pipeline: PipelineOverrides,
    pub output: OutputOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QuantConnectOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnthropicOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_revisions: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<PathBuf>,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. TOML config file(s)
    /// 3. `.env` file
    /// 4. Process environment
    /// 5. Explicit overrides
    pub fn load(
        sources: &ConfigSources,
        overrides: &ConfigOverrides,
    ) -> Result<FileConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        for path in Self::config_files(&sources.config_file)? {
            debug!("Loading config file {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        let dotenv_pairs = Self::read_env_file(&sources.env_file)?;
        figment = figment
            .merge(Serialized::defaults(env_layer(&dotenv_pairs)?))
            .merge(Serialized::defaults(env_layer(&sources.process_env)?))
            .merge(Serialized::defaults(overrides));

        let config: FileConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the global config file path
    ///
    /// Returns `$XDG_CONFIG_HOME/qcforge/config.toml` (or the platform
    /// equivalent).
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("qcforge").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Config files to merge, lowest priority first
    fn config_files(source: &ConfigFileSource) -> Result<Vec<PathBuf>, ConfigError> {
        match source {
            ConfigFileSource::Disabled => Ok(Vec::new()),
            ConfigFileSource::Explicit(path) => {
                if path.exists() {
                    Ok(vec![path.clone()])
                } else {
                    Err(ConfigError::FileNotFound(path.clone()))
                }
            }
            ConfigFileSource::Discover => Ok(Self::global_config_path()
                .filter(|p| p.exists())
                .into_iter()
                .chain(Self::project_config_path())
                .collect()),
        }
    }

    fn env_file_path(source: &EnvFileSource) -> Option<PathBuf> {
        match source {
            EnvFileSource::Default => Some(PathBuf::from(".env")),
            EnvFileSource::Explicit(path) => Some(path.clone()),
            EnvFileSource::Disabled => None,
        }
    }

    /// Read `KEY=VALUE` pairs from the env file, if one applies
    fn read_env_file(source: &EnvFileSource) -> Result<Vec<(String, String)>, ConfigError> {
        let Some(path) = Self::env_file_path(source) else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return match source {
                EnvFileSource::Explicit(_) => Err(ConfigError::FileNotFound(path)),
                _ => Ok(Vec::new()),
            };
        }

        debug!("Loading env file {}", path.display());
        let env_error = |e: dotenvy::Error| ConfigError::EnvFile {
            path: path.clone(),
            message: e.to_string(),
        };
        dotenvy::from_path_iter(&path)
            .map_err(env_error)?
            .map(|item| item.map_err(env_error))
            .collect()
    }

    /// Print the config file locations being used (for `--show-config`)
    pub fn print_config_sources(sources: &ConfigSources) {
        println!("Configuration sources (lowest to highest priority):");
        println!("  [     ] Default: built-in defaults");

        match &sources.config_file {
            ConfigFileSource::Disabled => println!("  [ OFF ] Config:  disabled by --no-config"),
            ConfigFileSource::Explicit(path) => print_file("Config: ", path),
            ConfigFileSource::Discover => {
                if let Some(path) = Self::global_config_path() {
                    print_file("Global: ", &path);
                }
                match Self::project_config_path() {
                    Some(path) => print_file("Project:", &path),
                    None => println!("  [     ] Project: ./qcforge.toml or ./.qcforge.toml"),
                }
            }
        }

        match Self::env_file_path(&sources.env_file) {
            Some(path) => print_file(".env:   ", &path),
            None => println!("  [ OFF ] .env:    disabled"),
        }

        let names: Vec<&str> = known_env_keys()
            .iter()
            .filter(|k| sources.process_env.iter().any(|(name, _)| name == k.name))
            .map(|k| k.name)
            .collect();
        if names.is_empty() {
            println!("  [     ] Env:     no recognized variables set");
        } else {
            println!("  [FOUND] Env:     {}", names.join(", "));
        }
        println!("  [     ] Flags:   command-line overrides");
    }
}

fn print_file(label: &str, path: &Path) {
    let mark = if path.exists() { "FOUND" } else { "     " };
    println!("  [{}] {} {}", mark, label, path.display());
}

/// Turn recognized `KEY=VALUE` pairs into a nested config layer.
///
/// Unknown keys and empty values are ignored; count keys must parse as
/// non-negative integers.
fn env_layer(pairs: &[(String, String)]) -> Result<Value, ConfigError> {
    let mut root = Map::new();
    for (name, raw) in pairs {
        let Some(info) = lookup_env_key(name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = match info.kind {
            ValueKind::Text => Value::String(raw.to_string()),
            ValueKind::Count => raw
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| ConfigError::InvalidNumber {
                    key: name.clone(),
                    value: raw.to_string(),
                })?,
        };

        let (section, field) = info
            .config_path
            .split_once('.')
            .unwrap_or(("", info.config_path));
        let table = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(table) = table {
            table.insert(field.to_string(), value);
        }
    }
    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn hermetic(env_file: Option<&NamedTempFile>) -> ConfigSources {
        ConfigSources {
            config_file: ConfigFileSource::Disabled,
            env_file: match env_file {
                Some(f) => EnvFileSource::Explicit(f.path().to_path_buf()),
                None => EnvFileSource::Disabled,
            },
            process_env: Vec::new(),
        }
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load(&hermetic(None), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.quantconnect.project_name, "SPX_0DTE_Strategy");
        assert!(config.anthropic.api_key.is_none());
    }

    #[test]
    fn test_env_file_supplies_credentials() {
        let dotenv = file_with(
            "QUANTCONNECT_USER_ID=12345\nQUANTCONNECT_API_TOKEN=qc-token\nANTHROPIC_API_KEY=sk-ant\nMAX_COMPILE_ATTEMPTS=5\n",
        );
        let config =
            ConfigLoader::load(&hermetic(Some(&dotenv)), &ConfigOverrides::default()).unwrap();

        let creds = config.credentials().unwrap();
        assert_eq!(creds.user_id(), "12345");
        assert_eq!(creds.api_token(), "qc-token");
        assert_eq!(config.pipeline.max_attempts, 5);
    }

    #[test]
    fn test_overrides_beat_env_file() {
        let dotenv = file_with(
            "ANTHROPIC_API_KEY=from-dotenv\nQC_PROJECT_NAME=DotenvProject\nQUANTCONNECT_USER_ID=111\nQUANTCONNECT_API_TOKEN=dotenv-token\n",
        );
        let overrides = ConfigOverrides {
            anthropic: AnthropicOverrides {
                api_key: Some("from-flag".into()),
                ..Default::default()
            },
            quantconnect: QuantConnectOverrides {
                user_id: Some("999".into()),
                api_token: Some("flag-token".into()),
                project_name: Some("FlagProject".into()),
            },
            ..Default::default()
        };

        let config = ConfigLoader::load(&hermetic(Some(&dotenv)), &overrides).unwrap();
        assert_eq!(config.anthropic.api_key.as_deref(), Some("from-flag"));
        assert_eq!(config.quantconnect.project_name, "FlagProject");

        let creds = config.credentials().unwrap();
        assert_eq!(creds.user_id(), "999");
        assert_eq!(creds.api_token(), "flag-token");
    }

    #[test]
    fn test_process_env_beats_env_file() {
        let dotenv = file_with("ANTHROPIC_MODEL=opus\n");
        let mut sources = hermetic(Some(&dotenv));
        sources.process_env = env(&[("ANTHROPIC_MODEL", "haiku")]);

        let config = ConfigLoader::load(&sources, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.anthropic.model, Model::ClaudeHaiku45);
    }

    #[test]
    fn test_env_file_beats_toml() {
        let toml = file_with("[pipeline]\nmax_revisions = 7\nmax_attempts = 4\n");
        let dotenv = file_with("MAX_REVISION_ATTEMPTS=2\n");
        let sources = ConfigSources {
            config_file: ConfigFileSource::Explicit(toml.path().to_path_buf()),
            env_file: EnvFileSource::Explicit(dotenv.path().to_path_buf()),
            process_env: Vec::new(),
        };

        let config = ConfigLoader::load(&sources, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.pipeline.max_revisions, 2);
        assert_eq!(config.pipeline.max_attempts, 4);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let mut sources = hermetic(None);
        sources.process_env = env(&[("MAX_AGENT_TURNS", "many")]);

        let err = ConfigLoader::load(&sources, &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { ref key, .. } if key == "MAX_AGENT_TURNS"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut sources = hermetic(None);
        sources.process_env = env(&[("MAX_COMPILE_ATTEMPTS", "0")]);

        let err = ConfigLoader::load(&sources, &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ConfigValidationError::ZeroAttempts)));
    }

    #[test]
    fn test_empty_and_unknown_env_values_ignored() {
        let mut sources = hermetic(None);
        sources.process_env = env(&[("QC_PROJECT_NAME", "  "), ("HOME", "/root")]);

        let config = ConfigLoader::load(&sources, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.quantconnect.project_name, "SPX_0DTE_Strategy");
    }

    #[test]
    fn test_missing_explicit_files_are_errors() {
        let sources = ConfigSources {
            config_file: ConfigFileSource::Explicit(PathBuf::from("/nonexistent/qcforge.toml")),
            ..hermetic(None)
        };
        assert!(matches!(
            ConfigLoader::load(&sources, &ConfigOverrides::default()),
            Err(ConfigError::FileNotFound(_))
        ));

        let sources = ConfigSources {
            env_file: EnvFileSource::Explicit(PathBuf::from("/nonexistent/.env")),
            ..hermetic(None)
        };
        assert!(matches!(
            ConfigLoader::load(&sources, &ConfigOverrides::default()),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_missing_credential_maps_to_config_error() {
        let err: ConfigError = DomainError::MissingCredential("QUANTCONNECT_USER_ID").into();
        assert!(err.to_string().contains("QUANTCONNECT_USER_ID"));
        assert!(matches!(err, ConfigError::MissingCredential(_)));
    }

    #[test]
    fn test_env_layer_nests_sections() {
        let layer = env_layer(&env(&[("STRATEGY_TASK", "Trade"), ("AGENT_TIMEOUT", "90")])).unwrap();
        assert_eq!(layer["pipeline"]["task"], "Trade");
        assert_eq!(layer["agent"]["timeout_secs"], 90);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("qcforge"));
    }
}
