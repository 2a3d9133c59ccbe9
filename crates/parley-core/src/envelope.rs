//! The routed unit moved between the two endpoints of a session.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// Payload kind carried by an [`Envelope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// UTF-8 text frame (JSON events on both sides).
    Text,
    /// Binary frame.
    Binary,
    /// Relay-internal message, never read off a socket.
    System,
}

/// A payload addressed from one endpoint to its peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Endpoint that produced the payload.
    pub sender: ConnectionId,
    /// Endpoint that must receive it.
    pub receiver: ConnectionId,
    /// Raw payload bytes, unmodified.
    pub payload: Bytes,
    /// Frame kind the payload arrived as.
    pub kind: EnvelopeKind,
}

impl Envelope {
    /// Build an envelope.
    pub fn new(
        sender: ConnectionId,
        receiver: ConnectionId,
        kind: EnvelopeKind,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            sender,
            receiver,
            payload: payload.into(),
            kind,
        }
    }

    /// Build a text envelope.
    pub fn text(sender: ConnectionId, receiver: ConnectionId, payload: impl Into<Bytes>) -> Self {
        Self::new(sender, receiver, EnvelopeKind::Text, payload)
    }

    /// Whether this is a text envelope.
    pub fn is_text(&self) -> bool {
        self.kind == EnvelopeKind::Text
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
