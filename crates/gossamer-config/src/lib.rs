//! Configuration management for gossamer nodes
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, applied by the binary)
//! 2. Environment variables (`GOSSAMER_<SECTION>__<KEY>`), plus the legacy
//!    `DEBUG` integer flag
//! 3. gossamer.local.toml (gitignored, local overrides)
//! 4. gossamer.toml (git-tracked, project config)
//! 5. Built-in defaults (lowest precedence)

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod error;
mod loader;

#[cfg(test)]
mod tests;

pub use error::ConfigError;
pub use loader::{ConfigLoader, LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE, parse_debug_flag};

/// Main gossamer configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossamerConfig {
    pub log: LogConfig,
    pub runtime: RuntimeConfig,
    pub gossip: GossipSettings,
    pub counter: CounterSettings,
}

impl GossamerConfig {
    /// Checks cross-field constraints the types cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gossip.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "gossip.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.counter.service.trim().is_empty() {
            return Err(ConfigError::Validation(
                "counter.service must name a key-value service".to_string(),
            ));
        }
        if self.counter.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "counter.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log at debug level instead of info.
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Period of the hook timer in milliseconds; 0 runs hooks only when
    /// a message arrives.
    pub tick_ms: u64,
}

impl RuntimeConfig {
    pub fn tick(&self) -> Option<Duration> {
        (self.tick_ms > 0).then(|| Duration::from_millis(self.tick_ms))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick_ms: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipSettings {
    pub interval_ms: u64,
    pub track_neighbors: bool,
    pub full_sync_every: u32,
}

impl GossipSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for GossipSettings {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            track_neighbors: true,
            full_sync_every: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterSettings {
    pub service: String,
    pub request_timeout_ms: u64,
}

impl CounterSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            service: "seq-kv".to_string(),
            request_timeout_ms: 1000,
        }
    }
}
