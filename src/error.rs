//! Error types for Tideway

use thiserror::Error;

/// Result type alias for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Main error type for the channel layer
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Send was attempted while the channel was not open. The message was
    /// dropped, not queued.
    #[error("channel is not open")]
    NotOpen,

    #[error("invalid origin: {0}")]
    InvalidOrigin(#[from] url::ParseError),

    #[error("unsupported origin scheme: {0}")]
    UnsupportedScheme(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The channel driver task is gone (the handle outlived a runtime
    /// shutdown, or the driver panicked).
    #[error("channel driver stopped")]
    Stopped,
}
