//! Engine configuration
//!
//! Loaded from `ENGINE_*` environment variables; nested keys use `__`
//! (`ENGINE_DATABASE__URL`, `ENGINE_ADJUDICATION__BUDGET_ENFORCEMENT`).
//! Anything unset keeps its default.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use domain_claims::AdjudicationSettings;
use infra_db::DatabaseConfig;

const ENV_PREFIX: &str = "ENGINE";

/// Where policies and claims are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Postgres => f.write_str("postgres"),
            StorageBackend::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/coverage_claims".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

impl DatabaseSettings {
    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageBackend,
    pub database: DatabaseSettings,
    pub adjudication: AdjudicationSettings,
    pub logging: LoggingConfig,
    /// Seed the demo contracts into an empty store at startup
    pub seed_demo_data: bool,
}

impl EngineConfig {
    /// Loads `.env` if present, then the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Loads configuration from `ENGINE_*` variables
    ///
    /// `DATABASE_URL` is honoured when `ENGINE_DATABASE__URL` is unset.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::build(environment(None), std::env::var("DATABASE_URL").ok())
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self, config::ConfigError> {
        let database_url = vars.get("DATABASE_URL").cloned();
        Self::build(environment(Some(vars)), database_url)
    }

    fn build(source: config::Environment, database_url: Option<String>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("database.url", database_url.unwrap_or_else(|| DatabaseSettings::default().url))?
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

fn environment(vars: Option<config::Map<String, String>>) -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(vars)
}
