//! Bounded counters for attempts and revisions

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// A counter that can only grow and never passes its maximum (Value Object)
///
/// Used for both the attempt budget (executions against QuantConnect) and the
/// revision budget (accepted code changes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    max: usize,
    used: usize,
}

impl Budget {
    /// Budget that may be zero (e.g. "never revise")
    pub fn new(max: usize) -> Self {
        Self { max, used: 0 }
    }

    /// Attempt budget: must allow at least one execution
    pub fn attempts(max: usize) -> Result<Self, DomainError> {
        if max == 0 {
            return Err(DomainError::ZeroBudget);
        }
        Ok(Self::new(max))
    }

    /// Consume one unit, returning its 1-based ordinal.
    ///
    /// Returns `None` once the budget is spent; the counter stays at `max`.
    pub fn try_consume(&mut self) -> Option<usize> {
        if self.used >= self.max {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }

    /// Like [`try_consume`](Self::try_consume) but as an error
    pub fn consume(&mut self) -> Result<usize, DomainError> {
        self.try_consume()
            .ok_or(DomainError::BudgetExhausted(self.max))
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn remaining(&self) -> usize {
        self.max - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }
}
