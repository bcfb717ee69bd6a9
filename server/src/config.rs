//! Server configuration

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Deserializer};

/// Runtime settings, loaded from TOML. Durations are written as `*_ms` keys.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Websocket listen address
    pub bind_addr: String,

    /// How long a challenge stays pending before it expires
    #[serde(rename = "challenge_timeout_ms", deserialize_with = "millis")]
    pub challenge_timeout: Duration,

    /// PvP only: a seat that has not chosen within this window forfeits
    #[serde(rename = "turn_timeout_ms", deserialize_with = "millis")]
    pub turn_timeout: Duration,

    /// Window after a link drops in which the player may reconnect
    #[serde(rename = "grace_period_ms", deserialize_with = "millis")]
    pub grace_period: Duration,

    /// Interval of the challenge expiry sweep
    #[serde(rename = "sweep_interval_ms", deserialize_with = "millis")]
    pub sweep_interval: Duration,

    /// Fixed seed for reproducible sessions
    pub rng_seed: Option<u64>,

    /// Base URL of the remote roster/inventory service; in-memory when unset
    pub store_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8700".to_string(),
            challenge_timeout: Duration::from_secs(60),
            turn_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(45),
            sweep_interval: Duration::from_secs(5),
            rng_seed: None,
            store_url: None,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Every duration must be positive; a zero sweep interval cannot tick
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("challenge_timeout_ms", self.challenge_timeout),
            ("turn_timeout_ms", self.turn_timeout),
            ("grace_period_ms", self.grace_period),
            ("sweep_interval_ms", self.sweep_interval),
        ] {
            ensure!(!value.is_zero(), "{} must be greater than zero", key);
        }
        Ok(())
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
