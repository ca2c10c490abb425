//! Connection state machine

use std::fmt;

/// Lifecycle state of a channel.
///
/// `Disconnected -> Connecting -> Open -> (Closing ->) Disconnected`, with
/// an `Open -> Connecting` edge when an unexpected closure triggers a
/// reconnect. Only an explicit `disconnect()` parks the channel in
/// `Disconnected` for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl ChannelState {
    /// Whether sends are currently accepted
    pub fn is_open(&self) -> bool {
        matches!(self, ChannelState::Open)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closing => "closing",
        };
        f.write_str(name)
    }
}
