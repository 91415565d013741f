use std::time::Duration;

use shema_core::constants::{POLL_INTERVAL_SECS, POLL_START_DELAY_SECS, WATCH_DEADLINE_SECS};
use shema_core::env_secs_with_default;

/// Timing of one watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Overall time allowed before the watch reports a timeout.
    pub deadline: Duration,
    /// Time given to the push channel before polling starts.
    pub poll_delay: Duration,
    /// Fixed period between polls. No backoff.
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(WATCH_DEADLINE_SECS),
            poll_delay: Duration::from_secs(POLL_START_DELAY_SECS),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }
}

impl WatchConfig {
    /// Reads `SHEMA_WATCH_TIMEOUT_SECS`, `SHEMA_POLL_DELAY_SECS` and
    /// `SHEMA_POLL_INTERVAL_SECS`, keeping the defaults for unset or invalid
    /// values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            deadline: env_secs_with_default("SHEMA_WATCH_TIMEOUT_SECS", WATCH_DEADLINE_SECS),
            poll_delay: env_secs_with_default("SHEMA_POLL_DELAY_SECS", POLL_START_DELAY_SECS),
            poll_interval: env_secs_with_default("SHEMA_POLL_INTERVAL_SECS", POLL_INTERVAL_SECS),
        }
    }
}
