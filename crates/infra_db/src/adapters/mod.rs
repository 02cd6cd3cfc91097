//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::adapters::{PostgresClaimsAdapter, PostgresPolicyAdapter};
//! use domain_claims::{AdjudicationSettings, ClaimsAdjudicator};
//!
//! let policies = Arc::new(PostgresPolicyAdapter::new(pool.clone()));
//! let claims = Arc::new(PostgresClaimsAdapter::new(pool));
//! let adjudicator = ClaimsAdjudicator::new(policies, claims, AdjudicationSettings::default());
//! ```

pub mod claims;
pub mod policy;

pub use claims::PostgresClaimsAdapter;
pub use policy::PostgresPolicyAdapter;

use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;

use core_kernel::{AdapterHealth, HealthCheckResult};

/// Runs `SELECT 1` against the pool and reports the round trip
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        },
        Err(e) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(format!("Database error: {}", e)),
            checked_at: Utc::now(),
        },
    }
}
