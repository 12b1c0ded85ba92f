//! Session limits and background timer cadences

use std::time::Duration;

use serde::Serialize;

use crate::{parse_env, ConfigError, ConfigResult};

/// Default retention window for a session (24 hours)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Default cadence of the expired-session sweep (1 hour)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Default per-session participant capacity
pub const DEFAULT_MAX_PARTICIPANTS: usize = 50;

/// Default cadence of the server-side playback heartbeat
pub const DEFAULT_HOST_SYNC_INTERVAL_MS: u64 = 2_000;

/// Default maximum chat message length in characters
pub const DEFAULT_MAX_CHAT_LENGTH: usize = 500;

/// Session limits shared by the registry, gateway and background tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Maximum session age before the sweep deletes it
    pub ttl_secs: u64,

    /// How often the sweep runs
    pub sweep_interval_secs: u64,

    /// Maximum participants per session
    pub max_participants: usize,

    /// Interval between playback heartbeats while a session is playing
    pub host_sync_interval_ms: u64,

    /// Maximum chat message length in characters
    pub max_chat_length: usize,
}

impl SessionConfig {
    /// Load session configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let config = Self {
            ttl_secs: parse_env("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
            max_participants: parse_env("MAX_PARTICIPANTS", DEFAULT_MAX_PARTICIPANTS)?,
            host_sync_interval_ms: parse_env(
                "HOST_SYNC_INTERVAL_MS",
                DEFAULT_HOST_SYNC_INTERVAL_MS,
            )?,
            max_chat_length: parse_env("MAX_CHAT_LENGTH", DEFAULT_MAX_CHAT_LENGTH)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject zero-valued limits and cadences
    pub fn validate(&self) -> ConfigResult<()> {
        let zero = [
            ("SESSION_TTL_SECS", self.ttl_secs == 0),
            ("SWEEP_INTERVAL_SECS", self.sweep_interval_secs == 0),
            ("MAX_PARTICIPANTS", self.max_participants == 0),
            ("HOST_SYNC_INTERVAL_MS", self.host_sync_interval_ms == 0),
            ("MAX_CHAT_LENGTH", self.max_chat_length == 0),
        ];

        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(ConfigError::ValidationError(format!(
                "{} must be greater than zero",
                name
            ))),
            None => Ok(()),
        }
    }

    /// Retention window as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweep cadence as a `Duration`
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Heartbeat cadence as a `Duration`
    pub fn host_sync_interval(&self) -> Duration {
        Duration::from_millis(self.host_sync_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            host_sync_interval_ms: DEFAULT_HOST_SYNC_INTERVAL_MS,
            max_chat_length: DEFAULT_MAX_CHAT_LENGTH,
        }
    }
}
