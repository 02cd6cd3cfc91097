//! Repository implementations
//!
//! Repositories own the SQL and speak in row types; the adapters in
//! [`crate::adapters`] translate those rows to and from the domain model.
//!
//! All queries are built at runtime with `sqlx::query_as` so the crate
//! compiles without a live database.

pub mod claims;
pub mod policy;

pub use claims::{ClaimsRepository, PayoutInsert, StatusChange};
pub use policy::PolicyRepository;
