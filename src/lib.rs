//! Tideway - realtime chat connection layer
//!
//! Persistent bidirectional WebSocket channel with reconnect/backoff,
//! heartbeat keep-alive, and per-type message dispatch, backing an AI
//! chat widget. The AI responder and the hosting UI are collaborators on
//! either side of a single send/receive contract; this crate owns only
//! the connection in between.

pub mod channel;
pub mod config;
pub mod error;
pub mod hub;
pub mod transport;
pub mod types;

pub use channel::{Channel, ChannelState, HandlerRegistry, ReconnectPolicy};
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use hub::ChannelHub;
pub use types::{Envelope, Payload, Session};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
