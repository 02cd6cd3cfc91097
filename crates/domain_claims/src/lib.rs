//! Claims Domain
//!
//! This crate implements the Claim Ledger and the Claims Adjudicator: claims
//! submitted against a single policy, their approve/reject lifecycle with
//! the atomic budget debit, and the reimbursement record that follows an
//! approval.
//!
//! # Claim Lifecycle
//!
//! ```text
//! submit -> Pending -> Approved -> (Reimbursement recorded once)
//!                  \-> Rejected
//! ```
//!
//! Reprocessing a terminal claim is an error, never a no-op.

pub mod claim;
pub mod adjudication;
pub mod reimbursement;
pub mod ports;
pub mod services;
pub mod error;

pub use claim::{Claim, ClaimQuery, ClaimStatus, ClaimWithPolicy, NewClaim};
pub use adjudication::{AdjudicationAction, AdjudicationOutcome, SubmissionReceipt};
pub use reimbursement::{PaymentMethod, Reimbursement, ReimbursementStatus};
pub use ports::{ClaimsPort, ReimbursementCommit, Transition};
pub use services::{
    AdjudicationSettings, ClaimsAdjudicator, ProcessClaim, RecordReimbursement, DEFAULT_CURRENCY_CODE,
};
pub use error::ClaimError;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryStore;
