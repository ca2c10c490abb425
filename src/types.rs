//! Wire types: the message envelope exchanged over the channel and the
//! session identity stamped onto outbound chat messages.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Message type of chat messages exchanged with the responder.
pub const CHAT_MESSAGE: &str = "chat_message";

/// Message type of the keep-alive frame.
pub const HEARTBEAT: &str = "heartbeat";

/// The JSON envelope exchanged over the channel.
///
/// `type` is the discriminator the dispatcher keys on; everything else is
/// optional payload. Each frame on the wire is one UTF-8 JSON-encoded
/// envelope, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Message type discriminator
    #[serde(rename = "type")]
    pub kind: String,

    /// Session identifier, stable across reconnects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// `Some(None)` is an explicit `"userId": null` (anonymous session);
    /// `None` means the field was absent entirely.
    #[serde(
        default,
        deserialize_with = "nullable_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<Option<String>>,

    /// Chat text for `chat_message` envelopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Loosely-typed payload; handlers receive this when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Deserializes a present-but-null field as `Some(None)`.
fn nullable_field<'de, D>(de: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

impl Envelope {
    /// Create an empty envelope of the given type
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            session_id: None,
            user_id: None,
            message: None,
            data: None,
        }
    }

    /// Create a chat message envelope stamped with the session identity.
    ///
    /// An anonymous session serializes `userId` as an explicit `null`,
    /// which is what the responder expects for guests.
    pub fn chat(session: &Session, text: impl Into<String>) -> Self {
        Self {
            kind: CHAT_MESSAGE.to_string(),
            session_id: Some(session.session_id.clone()),
            user_id: Some(session.user_id.clone()),
            message: Some(text.into()),
            data: None,
        }
    }

    /// Create a keep-alive envelope. Pure liveness signal, no payload.
    pub fn heartbeat() -> Self {
        Self::new(HEARTBEAT)
    }

    /// Project the loosely-typed envelope into a typed payload view.
    pub fn payload(&self) -> Payload {
        match self.kind.as_str() {
            CHAT_MESSAGE => Payload::Chat {
                message: self.message.clone(),
                data: self.data.clone(),
            },
            HEARTBEAT => Payload::Heartbeat,
            _ => Payload::Unknown {
                kind: self.kind.clone(),
                data: self.data.clone(),
            },
        }
    }
}

/// Typed view of an envelope's payload, keyed by message type.
///
/// Unrecognized types land in [`Payload::Unknown`] so newer peers can ship
/// new message types without breaking older clients.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Chat {
        message: Option<String>,
        data: Option<Value>,
    },
    Heartbeat,
    Unknown {
        kind: String,
        data: Option<Value>,
    },
}

/// Client identity carried on outbound chat messages.
///
/// The session id is generated once per client lifetime and survives
/// reconnects; the user id is optional (anonymous sessions are allowed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub user_id: Option<String>,
}

impl Session {
    /// Create an anonymous session with a fresh id
    pub fn anonymous() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: None,
        }
    }

    /// Create a session for a known user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: Some(user_id.into()),
        }
    }
}
