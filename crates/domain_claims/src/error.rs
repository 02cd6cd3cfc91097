//! Claims domain errors
//!
//! `ClaimError` is the engine-wide failure type: every operation reachable
//! from the engine facade reports through it, and [`ClaimError::kind`]
//! classifies it for callers.

use thiserror::Error;

use core_kernel::{ErrorKind, Money, MoneyError, PortError};
use domain_policy::PolicyError;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Claim not found: {0}")]
    ClaimNotFound(String),

    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("Policy {policy_id} is not active (status: {status})")]
    PolicyInactive { policy_id: String, status: String },

    #[error("Claim {claim_id} already processed (status: {status})")]
    ClaimAlreadyProcessed { claim_id: String, status: String },

    #[error("Claim {claim_id} is not approved (status: {status})")]
    ClaimNotApproved { claim_id: String, status: String },

    #[error("Reimbursement already recorded for claim {0}")]
    DuplicateReimbursement(String),

    /// Strict enforcement refused an approval past the annual cap
    #[error("Approving {covered} would exceed the annual budget of policy {policy_id}")]
    BudgetExceeded { policy_id: String, covered: Money },

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Unknown action '{0}', expected approve or reject")]
    UnknownAction(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClaimError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClaimError::Validation(message.into())
    }

    /// Maps the error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimError::ClaimNotFound(_) | ClaimError::PolicyNotFound(_) => ErrorKind::NotFound,
            ClaimError::PolicyInactive { .. } => ErrorKind::InactivePolicy,
            ClaimError::ClaimAlreadyProcessed { .. }
            | ClaimError::ClaimNotApproved { .. }
            | ClaimError::DuplicateReimbursement(_)
            | ClaimError::BudgetExceeded { .. } => ErrorKind::Conflict,
            ClaimError::MissingRequiredField(_)
            | ClaimError::UnknownAction(_)
            | ClaimError::Validation(_) => ErrorKind::InvalidInput,
            ClaimError::Policy(e) => e.kind(),
            ClaimError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Translates a storage failure that is not a domain decision
    pub fn from_port(error: PortError) -> Self {
        match error {
            PortError::Validation { message, .. } => ClaimError::Validation(message),
            other => ClaimError::Storage(other.to_string()),
        }
    }
}

impl From<MoneyError> for ClaimError {
    fn from(error: MoneyError) -> Self {
        ClaimError::Validation(error.to_string())
    }
}
