//! Agent mode parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Loop control for [`RunAgentUseCase`](crate::use_cases::run_agent::RunAgentUseCase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentParams {
    /// Model turns before giving up.
    pub max_turns: usize,
    /// Wall-clock limit for the whole run.
    pub timeout: Duration,
    /// Compile attempts the controller is told it may use.
    pub max_compile_attempts: usize,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            max_turns: 20,
            timeout: Duration::from_secs(800),
            max_compile_attempts: 3,
        }
    }
}

impl AgentParams {
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_compile_attempts(mut self, max: usize) -> Self {
        self.max_compile_attempts = max;
        self
    }
}
