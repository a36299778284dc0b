//! Model value object representing an Anthropic model

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Models the pipeline knows by name (Value Object)
///
/// Short aliases (`sonnet`, `opus`, `haiku`) resolve to full API ids.
/// Anything else passes through as [`Model::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    ClaudeSonnet4,
    ClaudeSonnet45,
    ClaudeOpus45,
    ClaudeHaiku45,
    Custom(String),
}

impl Model {
    /// Get the API identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::ClaudeSonnet4 => "claude-sonnet-4-20250514",
            Model::ClaudeSonnet45 => "claude-sonnet-4-5-20250929",
            Model::ClaudeOpus45 => "claude-opus-4-5-20251101",
            Model::ClaudeHaiku45 => "claude-haiku-4-5-20251001",
            Model::Custom(s) => s,
        }
    }

    /// Models offered when the user asks what is available
    pub fn known_models() -> Vec<Model> {
        vec![
            Model::ClaudeSonnet4,
            Model::ClaudeSonnet45,
            Model::ClaudeOpus45,
            Model::ClaudeHaiku45,
        ]
    }
}

impl Default for Model {
    /// Returns the default model (Claude Sonnet 4)
    fn default() -> Self {
        Model::ClaudeSonnet4
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "sonnet" | "sonnet-4" | "claude-sonnet-4" | "claude-sonnet-4-20250514" => {
                Model::ClaudeSonnet4
            }
            "sonnet-4.5" | "claude-sonnet-4.5" | "claude-sonnet-4-5-20250929" => {
                Model::ClaudeSonnet45
            }
            "opus" | "claude-opus-4.5" | "claude-opus-4-5-20251101" => Model::ClaudeOpus45,
            "haiku" | "claude-haiku-4.5" | "claude-haiku-4-5-20251001" => Model::ClaudeHaiku45,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.parse::<Model>() {
            Ok(model) => Ok(model),
            Err(never) => match never {},
        }
    }
}
