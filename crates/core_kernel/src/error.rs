//! Core error types used across the system

use thiserror::Error;
use crate::money::MoneyError;

/// Errors raised when a value or setting cannot be accepted
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// A quantity lies outside the range the ledger accepts
    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn out_of_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::OutOfRange {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        CoreError::Configuration(message.into())
    }
}
