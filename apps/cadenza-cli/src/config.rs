//! Client configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use cadenza_core::{ClientConfig, ReconnectPolicy, ServerAddress};
use serde::Deserialize;

/// Client configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// `host:port`, `host`, or an absolute socket path.
    /// Override: `CADENZA_ADDRESS`
    pub address: String,

    /// Override: `CADENZA_PASSWORD`
    pub password: Option<String>,

    /// Number of pooled command connections.
    /// Override: `CADENZA_POOL_SIZE`
    pub pool_size: usize,

    /// Status poll period in milliseconds.
    /// Override: `CADENZA_STATUS_INTERVAL_MS`
    pub status_interval_ms: u64,

    pub connect_timeout_ms: u64,

    /// Automatic reconnect attempts after a lost session (0 disables).
    pub reconnect_attempts: u32,

    /// Delay before each reconnect attempt; the last one repeats.
    pub reconnect_delays_ms: Vec<u64>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let core = ClientConfig::default();
        Self {
            address: core.address.to_string(),
            password: None,
            pool_size: core.pool_size,
            status_interval_ms: core.status_interval_ms,
            connect_timeout_ms: core.connect_timeout_ms,
            reconnect_attempts: core.reconnect.max_attempts,
            reconnect_delays_ms: core.reconnect.delays_ms,
        }
    }
}

impl CliConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CADENZA_POOL_SIZE") {
            if let Ok(size) = val.parse() {
                self.pool_size = size;
            }
        }

        if let Ok(val) = std::env::var("CADENZA_STATUS_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.status_interval_ms = interval;
            }
        }

        // Note: CADENZA_ADDRESS and CADENZA_PASSWORD are handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to cadenza-core's ClientConfig type.
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let address: ServerAddress = self
            .address
            .parse()
            .with_context(|| format!("Invalid server address: {}", self.address))?;

        let config = ClientConfig {
            address,
            password: self.password.clone().filter(|p| !p.is_empty()),
            pool_size: self.pool_size,
            status_interval_ms: self.status_interval_ms,
            connect_timeout_ms: self.connect_timeout_ms,
            reconnect: ReconnectPolicy {
                max_attempts: self.reconnect_attempts,
                delays_ms: self.reconnect_delays_ms.clone(),
            },
            ..Default::default()
        };
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
        Ok(config)
    }
}
