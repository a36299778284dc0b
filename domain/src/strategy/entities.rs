//! Strategy entities

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Default task used when neither the CLI nor the environment provides one
pub const DEFAULT_TASK: &str = "Create a 0DTE options trading strategy for SPX.";

/// A trading strategy request (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTask {
    content: String,
}

impl StrategyTask {
    pub fn new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyTask);
        }
        Ok(Self {
            content: trimmed.to_string(),
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Default for StrategyTask {
    fn default() -> Self {
        Self {
            content: DEFAULT_TASK.to_string(),
        }
    }
}

impl std::fmt::Display for StrategyTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// Python source of a QuantConnect algorithm (Value Object)
///
/// Always non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyCode(String);

impl StrategyCode {
    pub fn new(source: impl Into<String>) -> Result<Self, DomainError> {
        let source = source.into();
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyCode);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }
}

impl std::fmt::Display for StrategyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// QuantConnect project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl ProjectId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ProjectId)
    }
}
