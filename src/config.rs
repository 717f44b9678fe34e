use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub accrual: AccrualConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL for the ledger store
    pub url: String,
    /// Pool size; sized for the request call sites plus the worker
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before giving up
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://market:1@localhost:5432/market".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccrualConfig {
    /// Base address of the external accrual service
    pub address: String,
    /// Seconds between reconciliation ticks
    pub poll_interval_secs: u64,
    /// Per-request timeout for accrual fetches
    pub request_timeout_secs: u64,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:8080".to_string(),
            poll_interval_secs: 3,
            request_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config: AppConfig =
            serde_yaml::from_str(&content).context("Failed to parse config yaml")?;

        // Environment overrides for deploy-time wiring
        if let Ok(dsn) = std::env::var("DATABASE_URL") {
            config.database.url = dsn;
        }
        if let Ok(addr) = std::env::var("ACCRUAL_ADDRESS") {
            config.accrual.address = addr;
        }

        Ok(config)
    }
}
