//! Client-side endpoint policies.
//!
//! The client endpoint does no translation: frames read from the user's
//! socket go to the upstream endpoint as they are, and service events are
//! written back unmodified. Only text envelopes carrying a service event
//! reach the client socket.

use std::convert::Infallible;

use bytes::Bytes;
use parley_core::{Envelope, EnvelopeKind};
use parley_protocol::ServerEvent;
use tracing::{debug, trace};

use super::endpoint::{EndpointLink, Inbound, InboundPolicy, OutboundPolicy};
use super::frame::Frame;

/// Read policy for the client socket.
#[derive(Debug, Default)]
pub struct ClientInbound;

impl InboundPolicy for ClientInbound {
    type Signal = Infallible;

    fn on_frame(
        &mut self,
        link: &EndpointLink,
        kind: EnvelopeKind,
        payload: Bytes,
    ) -> Inbound<Infallible> {
        trace!(?kind, len = payload.len(), "client frame");
        Inbound::forward(link.envelope(kind, payload))
    }
}

/// Write policy for the client socket.
#[derive(Debug, Default)]
pub struct ClientOutbound;

impl OutboundPolicy for ClientOutbound {
    type Signal = Infallible;

    fn on_envelope(&mut self, envelope: Envelope) -> Vec<Frame> {
        if !envelope.is_text() {
            debug!(
                kind = ?envelope.kind,
                sender = %envelope.sender,
                "non-text envelope not written to client"
            );
            return Vec::new();
        }
        if let Err(e) = ServerEvent::decode(&envelope.payload) {
            debug!(
                error = %e,
                sender = %envelope.sender,
                "non-event payload not written to client"
            );
            return Vec::new();
        }
        envelope
            .payload_str()
            .map(|text| vec![Frame::Text(text.to_owned())])
            .unwrap_or_default()
    }

    fn on_signal(&mut self, signal: Infallible) -> Vec<Frame> {
        match signal {}
    }
}
