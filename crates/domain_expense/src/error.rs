//! Expense domain errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while validating an expense or computing its splits
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SplitError {
    /// The requested splits cannot be applied to the expense
    ///
    /// `expected` and `actual` carry the totals when the failure is a sum
    /// mismatch, so callers can report them.
    #[error("Invalid split: {reason}")]
    InvalidSplit {
        reason: String,
        expected: Option<Decimal>,
        actual: Option<Decimal>,
    },

    /// The expense cannot be split at all
    #[error("Degenerate input: {0}")]
    Degenerate(String),
}

impl SplitError {
    /// Creates an InvalidSplit error without totals
    pub fn invalid(reason: impl Into<String>) -> Self {
        SplitError::InvalidSplit {
            reason: reason.into(),
            expected: None,
            actual: None,
        }
    }

    /// Creates an InvalidSplit error for a total that misses its target
    pub fn mismatch(reason: impl Into<String>, expected: Decimal, actual: Decimal) -> Self {
        SplitError::InvalidSplit {
            reason: reason.into(),
            expected: Some(expected),
            actual: Some(actual),
        }
    }

    /// Creates a Degenerate error
    pub fn degenerate(reason: impl Into<String>) -> Self {
        SplitError::Degenerate(reason.into())
    }
}
