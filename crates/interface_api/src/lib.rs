//! Coverage & Claims Engine interface
//!
//! The collaborator-facing surface of the engine. There is no transport
//! here; callers hand validated request structs to [`InsuranceEngine`] and
//! get back response structs whose monetary fields serialize as
//! two-decimal strings.
//!
//! # Modules
//!
//! - **DTOs**: camelCase requests with `validator` rules, and responses
//! - **Engine**: service wiring over PostgreSQL or the in-memory store
//! - **Config**: `ENGINE_*` environment configuration
//! - **Telemetry**: tracing subscriber bootstrap
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{EngineConfig, InsuranceEngine};
//!
//! let config = EngineConfig::load()?;
//! let engine = InsuranceEngine::connect(&config).await?;
//! let coverage = engine.verify_coverage(request).await?;
//! ```

pub mod config;
pub mod dto;
pub mod engine;
pub mod error;
pub mod telemetry;

pub use config::{DatabaseSettings, EngineConfig, LogFormat, LoggingConfig, StorageBackend};
pub use engine::{EngineHealth, InsuranceEngine, DEMO_PATIENT_KEY};
pub use error::EngineError;
pub use telemetry::init_tracing;
