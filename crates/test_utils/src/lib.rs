//! Test Utilities Crate
//!
//! Shared fixtures, builders, generators and assertions for the coverage
//! and claims test suites.
//!
//! # Modules
//!
//! - `fixtures`: demo contracts, patients and invoices
//! - `builders`: builders for policies and invoices
//! - `database`: PostgreSQL test containers with migrations applied
//! - `assertions`: ledger invariant checks
//! - `generators`: proptest strategies

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
