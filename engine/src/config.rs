//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tangle_types::Network;
use tangle_wallet::InclusionPolicy;

use crate::EngineError;

/// Node endpoints of one network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// Configuration for the transaction engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory of the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Attempts a transaction gets before it is abandoned.
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,

    /// Age after which an in-progress (or never started) transaction is
    /// flagged for retry by the sweep.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_inclusion_poll_interval_ms")]
    pub inclusion_poll_interval_ms: u64,

    #[serde(default = "default_inclusion_max_attempts")]
    pub inclusion_max_attempts: u32,

    /// Health probes per endpoint selection.
    #[serde(default = "default_endpoint_max_attempts")]
    pub endpoint_max_attempts: u32,

    /// Capacity of the trigger queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to serve Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Endpoints per network, keyed by network name (`iota`, `atoi`, `smr`, `rms`).
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tangle_data")
}

fn default_max_retry() -> u32 {
    3
}

fn default_stale_after_secs() -> u64 {
    600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_inclusion_poll_interval_ms() -> u64 {
    5_000
}

fn default_inclusion_max_attempts() -> u32 {
    60
}

fn default_endpoint_max_attempts() -> u32 {
    5
}

fn default_queue_capacity() -> usize {
    1_024
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9_464
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.configured_networks()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Networks with at least one endpoint, with their endpoint lists.
    pub fn configured_networks(&self) -> Result<Vec<(Network, Vec<String>)>, EngineError> {
        let mut out = Vec::new();
        for (name, network) in &self.networks {
            let parsed: Network = name
                .parse()
                .map_err(|_| EngineError::Config(format!("unknown network: {name}")))?;
            if !network.endpoints.is_empty() {
                out.push((parsed, network.endpoints.clone()));
            }
        }
        Ok(out)
    }

    pub fn stale_after(&self) -> u64 {
        self.stale_after_secs
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn inclusion_policy(&self) -> InclusionPolicy {
        InclusionPolicy {
            poll_interval: Duration::from_millis(self.inclusion_poll_interval_ms),
            max_attempts: self.inclusion_max_attempts.max(1),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_retry: default_max_retry(),
            stale_after_secs: default_stale_after_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            inclusion_poll_interval_ms: default_inclusion_poll_interval_ms(),
            inclusion_max_attempts: default_inclusion_max_attempts(),
            endpoint_max_attempts: default_endpoint_max_attempts(),
            queue_capacity: default_queue_capacity(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            metrics_port: default_metrics_port(),
            networks: BTreeMap::new(),
        }
    }
}
