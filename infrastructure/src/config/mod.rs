//! Configuration loading for qcforge
//!
//! This module handles file I/O and merging of configuration from multiple
//! sources. The priority order (lowest to highest):
//!
//! 1. Default values
//! 2. `$XDG_CONFIG_HOME/qcforge/config.toml`, then `./qcforge.toml`
//!    (or the `--config <path>` file instead)
//! 3. `.env` file
//! 4. Process environment
//! 5. Command-line flags

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileAnthropicConfig, FileConfig, FileOutputConfig,
    FilePipelineConfig, FileQuantConnectConfig,
};
pub use loader::{
    AnthropicOverrides, ConfigError, ConfigFileSource, ConfigLoader, ConfigOverrides,
    ConfigSources, EnvFileSource, OutputOverrides, PipelineOverrides, QuantConnectOverrides,
};
