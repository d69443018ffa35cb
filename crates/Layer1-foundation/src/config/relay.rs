//! Relay Config - unified settings
//!
//! Credentials for the remote agent service plus engine tuning knobs.
//! Everything can be loaded from the environment; per-request overrides
//! are handled at the gateway boundary, not here.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default base URL of the remote agent service
pub const DEFAULT_BASE_URL: &str = "https://api.codegen.com";

// ============================================================================
// Remote service credentials
// ============================================================================

/// Credentials and endpoint for the remote agent service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Organization identifier
    pub org_id: String,

    /// API token
    pub token: String,

    /// Base URL of the service
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            org_id: String::new(),
            token: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl RemoteConfig {
    /// Load from environment variables
    ///
    /// Reads `RELAY_ORG_ID`, `RELAY_TOKEN`, `RELAY_BASE_URL`.
    pub fn from_env() -> Self {
        Self {
            org_id: std::env::var("RELAY_ORG_ID").unwrap_or_default(),
            token: std::env::var("RELAY_TOKEN").unwrap_or_default(),
            base_url: std::env::var("RELAY_BASE_URL").unwrap_or_else(|_| default_base_url()),
        }
    }

    /// Whether enough is present to talk to the service
    pub fn is_configured(&self) -> bool {
        !self.org_id.is_empty() && !self.token.is_empty()
    }
}

// ============================================================================
// Engine tuning
// ============================================================================

/// Tuning knobs for the task lifecycle engine
///
/// The poll cadence is engine-wide, not per-task. `max_ticks` bounds total
/// session lifetime: the defaults give 10 minutes at a 5 second interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between remote refresh calls (milliseconds)
    pub poll_interval_ms: u64,

    /// Maximum poll ticks before the session times out
    pub max_ticks: u32,

    /// Interval between keepalive heartbeats (milliseconds)
    pub heartbeat_interval_ms: u64,

    /// Capacity of each session's event channel
    pub channel_capacity: usize,

    /// Treat presence of result data as completion even when the status
    /// string does not say so (known source of false positives)
    pub defensive_completion: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_ticks: 120,
            heartbeat_interval_ms: 15_000,
            channel_capacity: 64,
            defensive_completion: true,
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, falling back to defaults
    ///
    /// Reads `RELAY_POLL_INTERVAL_MS`, `RELAY_MAX_TICKS`,
    /// `RELAY_HEARTBEAT_INTERVAL_MS`, `RELAY_CHANNEL_CAPACITY`,
    /// `RELAY_DEFENSIVE_COMPLETION`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            poll_interval_ms: env_parse("RELAY_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            max_ticks: env_parse("RELAY_MAX_TICKS", defaults.max_ticks),
            heartbeat_interval_ms: env_parse(
                "RELAY_HEARTBEAT_INTERVAL_MS",
                defaults.heartbeat_interval_ms,
            ),
            channel_capacity: env_parse("RELAY_CHANNEL_CAPACITY", defaults.channel_capacity),
            defensive_completion: env_parse(
                "RELAY_DEFENSIVE_COMPLETION",
                defaults.defensive_completion,
            ),
        }
    }

    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Heartbeat interval as a `Duration`
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be > 0".into()));
        }
        if self.max_ticks == 0 {
            return Err(Error::Config("max_ticks must be > 0".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::Config("heartbeat_interval_ms must be > 0".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be > 0".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Unified config
// ============================================================================

/// Unified RelayCode configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Remote service credentials
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load everything from the environment
    pub fn from_env() -> Self {
        Self {
            remote: RemoteConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }

    /// Validate the engine section
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()
    }
}
