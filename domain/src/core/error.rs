//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Strategy task cannot be empty")]
    EmptyTask,

    #[error("Strategy code cannot be empty")]
    EmptyCode,

    #[error("Attempt budget must allow at least one attempt")]
    ZeroBudget,

    #[error("Attempt budget exhausted after {0} attempts")]
    BudgetExhausted(usize),
}

impl DomainError {
    /// Check if this error is about missing or empty credentials
    pub fn is_credential_error(&self) -> bool {
        matches!(self, DomainError::MissingCredential(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_display() {
        let error = DomainError::MissingCredential("QUANTCONNECT_API_TOKEN");
        assert_eq!(
            error.to_string(),
            "Missing credential: QUANTCONNECT_API_TOKEN"
        );
        assert!(error.is_credential_error());
    }

    #[test]
    fn test_budget_exhausted_display() {
        let error = DomainError::BudgetExhausted(3);
        assert!(error.to_string().contains("3 attempts"));
        assert!(!error.is_credential_error());
    }
}
