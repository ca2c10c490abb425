//! WebSocket transport over tokio-tungstenite

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message},
    MaybeTlsStream, WebSocketStream,
};

use super::{Connection, Frame, Transport};
use crate::error::{ChannelError, Result};

/// Transport that dials real WebSocket endpoints.
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    type Conn = WsConnection;

    async fn connect(&mut self, url: &str) -> Result<WsConnection> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        Ok(WsConnection { stream })
    }
}

/// One live WebSocket connection.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Frame> {
        while let Some(item) = self.stream.next().await {
            match item {
                Ok(Message::Text(text)) => return Some(Frame::Text(text.to_string())),
                Ok(Message::Close(frame)) => {
                    return Some(Frame::Close(frame.map(|f| u16::from(f.code))))
                }
                // Pings are answered by tungstenite itself; binary and
                // pong frames are outside the protocol.
                Ok(_) => continue,
                Err(e) => {
                    // An error is a precursor to the close, not a separate
                    // retry trigger; end the stream and let the driver
                    // treat it as an unexpected close.
                    tracing::warn!(error = %e, "websocket read error");
                    return None;
                }
            }
        }
        None
    }

    async fn close(&mut self, code: u16) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "client disconnect".into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}
