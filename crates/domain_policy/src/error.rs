//! Policy domain errors
//!
//! This module defines all error types that can occur within the
//! policy store and the coverage calculator.

use thiserror::Error;

use core_kernel::{ErrorKind, Money, MoneyError, PortError, TemporalError};

/// Errors that can occur in the policy domain
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No policy with the given identifier
    #[error("Policy not found: {0}")]
    NotFound(String),

    /// Policy numbers are globally unique
    #[error("Policy number already exists: {0}")]
    DuplicatePolicyNumber(String),

    /// Required field is missing or blank
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// An update request carried no fields
    #[error("No fields to update")]
    NoFieldsToUpdate,

    /// The change would leave used budget above the annual maximum
    #[error("Used amount {used} would exceed annual maximum {max}")]
    BudgetExceeded {
        used: Money,
        max: Money,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Policy cannot be removed while claims reference it
    #[error("Policy {0} still has claims")]
    HasClaims(String),

    /// Storage adapter failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PolicyError {
    /// Creates a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PolicyError::Validation(message.into())
    }

    /// Creates a not found error
    pub fn not_found(policy_id: impl std::fmt::Display) -> Self {
        PolicyError::NotFound(policy_id.to_string())
    }

    /// Maps the error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            PolicyError::NotFound(_) => ErrorKind::NotFound,
            PolicyError::DuplicatePolicyNumber(_) | PolicyError::HasClaims(_) => ErrorKind::Conflict,
            PolicyError::MissingRequiredField(_)
            | PolicyError::NoFieldsToUpdate
            | PolicyError::BudgetExceeded { .. }
            | PolicyError::Validation(_) => ErrorKind::InvalidInput,
            PolicyError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Translates a port failure for the policy store
    pub fn from_port(error: PortError) -> Self {
        match error {
            PortError::NotFound { id, .. } => PolicyError::NotFound(id),
            PortError::Conflict { message } => PolicyError::DuplicatePolicyNumber(message),
            PortError::Validation { message, .. } => PolicyError::Validation(message),
            other => PolicyError::Storage(other.to_string()),
        }
    }
}

impl From<MoneyError> for PolicyError {
    fn from(error: MoneyError) -> Self {
        PolicyError::Validation(error.to_string())
    }
}

impl From<TemporalError> for PolicyError {
    fn from(error: TemporalError) -> Self {
        PolicyError::Validation(error.to_string())
    }
}
