//! Coverage & Claims Engine - setup binary
//!
//! Connects to the configured store, applies pending migrations, optionally
//! seeds the demo contracts and reports adapter health.
//!
//! # Usage
//!
//! ```bash
//! # Migrate the database named by DATABASE_URL
//! cargo run --bin engine-setup
//!
//! # Migrate and seed the demo contracts into an empty store
//! ENGINE_DATABASE__URL=postgres://... cargo run --bin engine-setup -- --seed
//! ```
//!
//! # Environment Variables
//!
//! * `ENGINE_STORAGE` - `postgres` (default) or `memory`
//! * `ENGINE_DATABASE__URL` - PostgreSQL connection string (falls back to `DATABASE_URL`)
//! * `ENGINE_ADJUDICATION__BUDGET_ENFORCEMENT` - `strict` (default) or `snapshot`
//! * `ENGINE_LOGGING__LEVEL` - default filter when `RUST_LOG` is unset
//! * `ENGINE_LOGGING__FORMAT` - `pretty` (default) or `json`
//! * `ENGINE_SEED_DEMO_DATA` - seed without passing `--seed`

use anyhow::{bail, Context};
use core_kernel::AdapterHealth;
use interface_api::{init_tracing, EngineConfig, InsuranceEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load().context("failed to load engine configuration")?;
    init_tracing(&config.logging);

    let seed = config.seed_demo_data || std::env::args().skip(1).any(|arg| arg == "--seed");

    tracing::info!(
        backend = %config.storage,
        seed,
        "starting engine setup"
    );

    let engine = InsuranceEngine::connect(&config)
        .await
        .context("failed to initialise storage")?;

    if seed {
        let seeded = engine.seed_demo_data().await.context("failed to seed demo data")?;
        tracing::info!(seeded, "demo seed finished");
    }

    let health = engine.health().await;
    for adapter in &health.adapters {
        tracing::info!(
            adapter = %adapter.adapter_id,
            status = ?adapter.status,
            latency_ms = adapter.latency_ms,
            "adapter health"
        );
    }
    if health.status == AdapterHealth::Unhealthy {
        bail!("storage is unhealthy");
    }

    tracing::info!("engine setup complete");
    Ok(())
}
