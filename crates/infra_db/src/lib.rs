//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the Policy Store, the Claim Ledger and the
//! reimbursement record, built on SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] own the SQL and work with row types
//! - [`adapters`] implement the domain ports (`PolicyPort`, `ClaimsPort`)
//!   on top of the repositories
//! - [`pool`] builds the connection pool and applies the embedded
//!   migrations
//!
//! # Consistency
//!
//! A claim approval updates the claim row and the policy's `used_amount`
//! in one transaction, guarded by `status = 'pending'` and, under strict
//! budget enforcement, by `used_amount + covered <= max_annual_amount`.
//! Concurrent approvals against one policy therefore serialize on the
//! policy row and never overshoot the cap.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresPolicyAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/coverage_claims")).await?;
//! run_migrations(&pool).await?;
//! let policies = PostgresPolicyAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresClaimsAdapter, PostgresPolicyAdapter};
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
