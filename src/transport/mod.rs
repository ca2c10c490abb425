//! Transport seam between the channel driver and the wire
//!
//! The driver only sees the [`Transport`]/[`Connection`] traits, so tests
//! can script connections in memory while production dials real WebSocket
//! endpoints.

mod websocket;

pub use websocket::{WsConnection, WsTransport};

use async_trait::async_trait;
use url::Url;

use crate::config::WS_PATH;
use crate::error::{ChannelError, Result};

/// One inbound unit from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame carrying a JSON envelope
    Text(String),
    /// Peer closed the connection, with the close code when one was sent
    Close(Option<u16>),
}

/// Dials physical connections for a channel.
#[async_trait]
pub trait Transport: Send + 'static {
    type Conn: Connection;

    /// Open a new physical connection to `url`. Resolution of this future
    /// is the `Connecting -> Open` (or failure) edge of the channel state
    /// machine.
    async fn connect(&mut self, url: &str) -> Result<Self::Conn>;
}

/// One live physical connection.
#[async_trait]
pub trait Connection: Send {
    /// Transmit one text frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next inbound frame. `None` means the stream ended without a close
    /// frame, which the driver treats like an unexpected close.
    async fn recv(&mut self) -> Option<Frame>;

    /// Close the connection with the given close code
    async fn close(&mut self, code: u16) -> Result<()>;
}

/// Derive the realtime endpoint URL from a page origin.
///
/// Upgrades the scheme to its WebSocket variant (secure stays secure) and
/// replaces any path with the fixed well-known path.
pub fn endpoint_url(origin: &str) -> Result<String> {
    let mut url = Url::parse(origin)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ChannelError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|()| ChannelError::UnsupportedScheme(url.scheme().to_string()))?;
    url.set_path(WS_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}
