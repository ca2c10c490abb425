//! Exponential reconnect backoff

use std::time::Duration;

use crate::config::ChannelConfig;

/// Reconnect schedule: `min(base * 2^attempt, cap)` with a hard ceiling on
/// the number of attempts per failure streak.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
        }
    }

    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::new(
            config.reconnect_base,
            config.reconnect_cap,
            config.max_reconnect_attempts,
        )
    }

    /// Delay before reconnect attempt `attempt` (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.cap)
    }

    /// Whether the attempt budget for this failure streak is spent
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}
