//! Core Kernel - Foundational types for the coverage and claims engine
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money and Percentage with precise decimal arithmetic
//! - Validity periods and the calendar timezone
//! - Strongly typed identifiers
//! - Port infrastructure for storage adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, MoneyError, Percentage, MAX_AMOUNT, MONEY_SCALE, PERCENTAGE_SCALE};
pub use temporal::{CoveragePeriod, TemporalError, Timezone};
pub use identifiers::{PolicyId, ClaimId, ReimbursementId};
pub use error::{CoreError, ErrorKind};
pub use ports::{PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable};
