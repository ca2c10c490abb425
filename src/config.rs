//! Channel configuration and protocol constants

use std::time::Duration;

/// Well-known path appended to the page origin to reach the realtime
/// endpoint. Fixed by the protocol, not configurable at runtime.
pub const WS_PATH: &str = "/ws";

/// Close code reserved for caller-initiated disconnects. A close carrying
/// this code must never trigger a reconnect.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Tunables for a channel's keep-alive and reconnect behavior.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Interval between keep-alive frames while the channel is open
    pub heartbeat_interval: Duration,
    /// Delay before the first reconnect attempt; doubles per attempt
    pub reconnect_base: Duration,
    /// Upper bound on the reconnect delay
    pub reconnect_cap: Duration,
    /// Reconnect attempts per failure streak before giving up
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            reconnect_base: Duration::from_secs(1),
            reconnect_cap: Duration::from_secs(30),
            max_reconnect_attempts: 5,
        }
    }
}
