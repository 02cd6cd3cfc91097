//! Policy Store Domain
//!
//! Insurance contracts between a patient and an insurer, each with a
//! coverage percentage and an annual budget cap, plus the pure Coverage
//! Calculator that turns a requested amount into an insurer/patient split.
//!
//! # Architecture
//!
//! - **Aggregate**: [`Policy`] owns the budget state (`used_amount` vs
//!   `max_annual_amount`)
//! - **Calculator**: [`coverage::verify`] (multi-policy, read-only) and
//!   [`coverage::split_for_claim`] (single policy, used at claim submission)
//! - **Port**: [`PolicyPort`] implemented by the storage adapters
//! - **Services**: [`PolicyService`], [`CoverageVerifier`]
//!
//! # Policy Status
//!
//! ```text
//! Active <-> Suspended
//!   |  \-> Cancelled
//!   \-> Expired   (also implied when today falls outside the validity period)
//! ```
//!
//! Status changes are administrative; the claims flow only moves
//! `used_amount`.

pub mod policy;
pub mod coverage;
pub mod error;
pub mod ports;
pub mod services;

pub use policy::{
    mask_patient_key, BudgetEnforcement, CoverageType, NewPolicy, Policy, PolicyQuery, PolicyStatus,
    PolicyUpdate, DEFAULT_COVERAGE_PERCENTAGE, DEFAULT_MAX_ANNUAL_AMOUNT,
};
pub use coverage::{CoverageSplit, CoverageVerification, PolicyContribution};
pub use error::PolicyError;
pub use ports::PolicyPort;
pub use services::{CoverageVerifier, PatientCoverage, PolicyService, NO_COVERAGE_MESSAGE};
