//! Environment key registry.
//!
//! Maps each recognized environment / `.env` variable to its dotted path in
//! the TOML configuration, so both sources feed the same fields.

/// Shape of the value behind a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    /// Non-negative integer; anything else is a configuration error
    Count,
}

/// Metadata for a single environment key.
#[derive(Debug, Clone)]
pub struct EnvKeyInfo {
    /// Variable name, e.g. `QUANTCONNECT_USER_ID`
    pub name: &'static str,
    /// Dotted path in the TOML config, e.g. `quantconnect.user_id`
    pub config_path: &'static str,
    pub description: &'static str,
    pub kind: ValueKind,
    /// Never printed
    pub secret: bool,
}

/// All recognized environment keys.
pub fn known_env_keys() -> &'static [EnvKeyInfo] {
    &KNOWN_ENV_KEYS
}

/// Look up an environment key by name.
pub fn lookup_env_key(name: &str) -> Option<&'static EnvKeyInfo> {
    KNOWN_ENV_KEYS.iter().find(|k| k.name == name)
}

const fn text(name: &'static str, config_path: &'static str, description: &'static str) -> EnvKeyInfo {
    EnvKeyInfo {
        name,
        config_path,
        description,
        kind: ValueKind::Text,
        secret: false,
    }
}

const fn secret(name: &'static str, config_path: &'static str, description: &'static str) -> EnvKeyInfo {
    EnvKeyInfo {
        name,
        config_path,
        description,
        kind: ValueKind::Text,
        secret: true,
    }
}

const fn count(name: &'static str, config_path: &'static str, description: &'static str) -> EnvKeyInfo {
    EnvKeyInfo {
        name,
        config_path,
        description,
        kind: ValueKind::Count,
        secret: false,
    }
}

static KNOWN_ENV_KEYS: [EnvKeyInfo; 13] = [
    // ==================== Credentials ====================
    text("QUANTCONNECT_USER_ID", "quantconnect.user_id", "QuantConnect user id"),
    secret("QUANTCONNECT_API_TOKEN", "quantconnect.api_token", "QuantConnect API token"),
    secret("ANTHROPIC_API_KEY", "anthropic.api_key", "Anthropic API key"),
    // ==================== Model ====================
    text("ANTHROPIC_MODEL", "anthropic.model", "Model id or alias"),
    text("ANTHROPIC_BASE_URL", "anthropic.base_url", "Messages API base URL"),
    // ==================== QuantConnect ====================
    text("QC_PROJECT_NAME", "quantconnect.project_name", "Project to create or reuse"),
    text("DOCKER_PLATFORM", "quantconnect.docker_platform", "Platform passed to docker run"),
    text("QC_MCP_IMAGE", "quantconnect.mcp_image", "MCP server image"),
    // ==================== Pipeline ====================
    text("STRATEGY_TASK", "pipeline.task", "Strategy request"),
    count("MAX_COMPILE_ATTEMPTS", "pipeline.max_attempts", "Executions per run"),
    count("MAX_REVISION_ATTEMPTS", "pipeline.max_revisions", "Accepted code revisions per run"),
    // ==================== Agent ====================
    count("MAX_AGENT_TURNS", "agent.max_turns", "Model turns in agent mode"),
    count("AGENT_TIMEOUT", "agent.timeout_secs", "Agent run timeout in seconds"),
];
