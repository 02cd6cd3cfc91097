//! Core error types used across the system

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use crate::money::MoneyError;
use crate::temporal::TemporalError;

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    /// True for errors caused by caller input rather than the environment
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CoreError::Money(_) | CoreError::Temporal(_) | CoreError::Validation(_)
        )
    }
}

/// Caller-facing classification of engine failures
///
/// Every domain error maps onto exactly one kind. None of them is retried:
/// the engine performs no I/O whose failure is expected to be transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Policy or claim does not exist
    NotFound,
    /// Duplicate policy number, duplicate reimbursement, already-processed claim
    Conflict,
    /// Missing or out-of-range input
    InvalidInput,
    /// Policy is not usable for new claims
    InactivePolicy,
    /// Storage failure
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InactivePolicy => "inactive_policy",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
