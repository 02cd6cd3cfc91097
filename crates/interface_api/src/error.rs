//! Engine error handling
//!
//! `EngineError` wraps the domain errors so callers get one type, and
//! classifies every failure into the shared `ErrorKind` taxonomy.

use thiserror::Error;

use core_kernel::ErrorKind;
use domain_claims::ClaimError;
use domain_policy::PolicyError;
use infra_db::DatabaseError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Claim(#[from] ClaimError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidRequest(_) => ErrorKind::InvalidInput,
            EngineError::Policy(e) => e.kind(),
            EngineError::Claim(e) => e.kind(),
            EngineError::Config(_) | EngineError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EngineError::InvalidRequest(crate::dto::describe(&errors))
    }
}
