//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_RECONNECT_GRACE_SECS: u64 = 30;
pub const DEFAULT_AUTO_END_TURN_MS: u64 = 1500;
pub const DEFAULT_TEARDOWN_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Durations that drive a match's timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTimings {
    /// How long a dropped player may take to come back
    pub reconnect_grace: Duration,
    /// Delay before an unplayable roll passes the turn
    pub auto_end_turn: Duration,
    /// Delay between a match concluding and its disposal
    pub teardown: Duration,
}

impl Default for MatchTimings {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(DEFAULT_RECONNECT_GRACE_SECS),
            auto_end_turn: Duration::from_millis(DEFAULT_AUTO_END_TURN_MS),
            teardown: Duration::from_secs(DEFAULT_TEARDOWN_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub timings: MatchTimings,
}

impl ServerConfig {
    /// Read `SERVER_ADDR`, `RECONNECT_GRACE_SECS`, `AUTO_END_TURN_MS` and
    /// `TEARDOWN_SECS`, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr_raw = lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "SERVER_ADDR",
                value: addr_raw.clone(),
            })?;

        let grace = read_u64(&lookup, "RECONNECT_GRACE_SECS", DEFAULT_RECONNECT_GRACE_SECS)?;
        let auto_end = read_u64(&lookup, "AUTO_END_TURN_MS", DEFAULT_AUTO_END_TURN_MS)?;
        let teardown = read_u64(&lookup, "TEARDOWN_SECS", DEFAULT_TEARDOWN_SECS)?;

        if grace == 0 {
            return Err(ConfigError::Zero("RECONNECT_GRACE_SECS"));
        }

        Ok(Self {
            addr,
            timings: MatchTimings {
                reconnect_grace: Duration::from_secs(grace),
                auto_end_turn: Duration::from_millis(auto_end),
                teardown: Duration::from_secs(teardown),
            },
        })
    }
}

fn read_u64<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}
