//! Process configuration, read once at startup into an immutable record and
//! passed into every component's constructor. There is no process-wide
//! mutable configuration singleton anywhere in this pipeline — a component
//! that needs a setting takes it (or a narrowed slice of it) as a
//! constructor argument.

use alloy_primitives::Address;
use pbs_errors::PbsError;
use std::time::Duration;

/// Top-level process configuration, sourced from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub eth_rpc_url: String,
    pub eth_ws_url: String,
    pub relay_urls: Vec<String>,
    pub adjustment_relay_url: Option<String>,
    pub archive_base_url: Option<String>,
    pub auxiliary_builder_addresses: Vec<Address>,

    pub rpc_batch_size: usize,
    pub rpc_concurrency: usize,
    pub balance_batch_size: usize,

    pub db_pool_size: u32,
    pub queue_capacity: usize,
    pub relay_pre_wait: Duration,
    pub shutdown_grace: Duration,

    pub metrics_addr: Option<String>,
}

impl Config {
    /// Reads the full configuration from the process environment. Missing
    /// required variables are a fatal-at-startup error.
    pub fn from_env() -> Result<Self, PbsError> {
        let database_url = required("DATABASE_URL")?;
        let eth_rpc_url = required("ETH_RPC_URL")?;
        let eth_ws_url = required("ETH_WS_URL")?;

        let relay_urls = optional_list("RELAY_URLS");
        let adjustment_relay_url = std::env::var("ADJUSTMENT_RELAY_URL").ok();
        let archive_base_url = std::env::var("ARCHIVE_BASE_URL").ok();

        let auxiliary_builder_addresses = optional_list("AUXILIARY_BUILDER_ADDRESSES")
            .into_iter()
            .map(|s| s.parse::<Address>().map_err(|e| PbsError::FatalStartup(format!("invalid address {s}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            database_url,
            eth_rpc_url,
            eth_ws_url,
            relay_urls,
            adjustment_relay_url,
            archive_base_url,
            auxiliary_builder_addresses,
            rpc_batch_size: parse_default("RPC_BATCH_SIZE", 50)?,
            rpc_concurrency: parse_default("RPC_CONCURRENCY", 8)?,
            balance_batch_size: parse_default("BALANCE_BATCH_SIZE", 10)?,
            db_pool_size: parse_default("DB_POOL_SIZE", 20)?,
            queue_capacity: parse_default("QUEUE_CAPACITY", 100)?,
            relay_pre_wait: Duration::from_secs(parse_default("RELAY_PRE_WAIT_SECS", 300)?),
            shutdown_grace: Duration::from_secs(parse_default("SHUTDOWN_GRACE_SECS", 30)?),
            metrics_addr: std::env::var("METRICS_ADDR").ok(),
        })
    }
}

fn required(key: &str) -> Result<String, PbsError> {
    std::env::var(key).map_err(|_| PbsError::FatalStartup(format!("missing required env var {key}")))
}

fn optional_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
        .unwrap_or_default()
}

fn parse_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, PbsError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| PbsError::FatalStartup(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_required_var_is_fatal_startup() {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in ["DATABASE_URL", "ETH_RPC_URL", "ETH_WS_URL"] {
            std::env::remove_var(key);
        }
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, PbsError::FatalStartup(_)));
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("DATABASE_URL", "postgres://localhost/pbs");
        std::env::set_var("ETH_RPC_URL", "https://rpc.example");
        std::env::set_var("ETH_WS_URL", "wss://rpc.example");
        std::env::remove_var("RPC_BATCH_SIZE");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.rpc_batch_size, 50);
        assert_eq!(cfg.db_pool_size, 20);
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("ETH_RPC_URL");
        std::env::remove_var("ETH_WS_URL");
    }
}
