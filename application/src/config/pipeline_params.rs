//! Pipeline parameters: revision loop control.
//!
//! [`PipelineParams`] groups the static parameters that control the
//! exec/revise loop in [`RunPipelineUseCase`](crate::use_cases::run_pipeline::RunPipelineUseCase).

use serde::{Deserialize, Serialize};

/// Revision loop control parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// QuantConnect project to create or reuse.
    pub project_name: String,
    /// File the algorithm is uploaded to.
    pub file_name: String,
    /// Maximum executions against QuantConnect (at least 1).
    pub max_attempts: usize,
    /// Maximum accepted code revisions.
    pub max_revisions: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            project_name: "SPX_0DTE_Strategy".to_string(),
            file_name: "main.py".to_string(),
            max_attempts: 3,
            max_revisions: 3,
        }
    }
}

impl PipelineParams {
    // ==================== Builder Methods ====================

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_max_revisions(mut self, max: usize) -> Self {
        self.max_revisions = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PipelineParams::default();
        assert_eq!(params.project_name, "SPX_0DTE_Strategy");
        assert_eq!(params.file_name, "main.py");
        assert_eq!(params.max_attempts, 3);
        assert_eq!(params.max_revisions, 3);
    }

    #[test]
    fn test_builder() {
        let params = PipelineParams::default()
            .with_project_name("Condor")
            .with_max_attempts(5)
            .with_max_revisions(0);
        assert_eq!(params.project_name, "Condor");
        assert_eq!(params.max_attempts, 5);
        assert_eq!(params.max_revisions, 0);
    }
}
