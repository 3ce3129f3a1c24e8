//! Pool configuration
//!
//! Tunables for the connection pool:
//! - Linger time before idle, unreferenced connections are dropped
//! - Floor for the reaper's sleep so a non-positive linger cannot spin it

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Default linger time in seconds
pub const DEFAULT_LINGER_SECONDS: i64 = 10;

/// Default floor for the reaper interval in milliseconds
pub const DEFAULT_MIN_REAP_INTERVAL_MS: u64 = 1000;

/// Environment variable overriding `linger_seconds`
pub const ENV_LINGER_SECONDS: &str = "LINGERPOOL_LINGER_SECONDS";

/// Environment variable overriding `min_reap_interval_ms`
pub const ENV_MIN_REAP_INTERVAL_MS: &str = "LINGERPOOL_MIN_REAP_INTERVAL_MS";

/// Configuration for a [`ConnectionPool`](crate::ConnectionPool)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Seconds an unreferenced connection may stay idle before it is dropped.
    /// Zero or negative means "drop on the next reaper pass".
    pub linger_seconds: i64,

    /// Lower bound for the reaper's sleep between passes
    pub min_reap_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            linger_seconds: DEFAULT_LINGER_SECONDS,
            min_reap_interval_ms: DEFAULT_MIN_REAP_INTERVAL_MS,
        }
    }
}

impl PoolConfig {
    /// Create a config with the given linger time and default reaper floor
    pub fn with_linger_seconds(linger_seconds: i64) -> Self {
        Self {
            linger_seconds,
            ..Self::default()
        }
    }

    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> PoolResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> PoolResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_LINGER_SECONDS) {
            config.linger_seconds = raw.trim().parse().map_err(|e| {
                PoolError::Config(format!("{}={:?}: {}", ENV_LINGER_SECONDS, raw, e))
            })?;
        }

        if let Some(raw) = lookup(ENV_MIN_REAP_INTERVAL_MS) {
            config.min_reap_interval_ms = raw.trim().parse().map_err(|e| {
                PoolError::Config(format!("{}={:?}: {}", ENV_MIN_REAP_INTERVAL_MS, raw, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> PoolResult<()> {
        if self.min_reap_interval_ms == 0 {
            return Err(PoolError::Config(
                "min_reap_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Reaper floor as a `Duration`
    pub fn min_reap_interval(&self) -> Duration {
        Duration::from_millis(self.min_reap_interval_ms)
    }
}
