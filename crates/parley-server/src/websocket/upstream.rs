//! Upstream-side endpoint policies.
//!
//! The read side decodes every service event, forwards it to the client
//! verbatim and tells the write side about the events that move the session
//! bootstrap. The write side owns the [`SessionBootstrap`]: it sends the
//! `session.update` on the first `session.created`, holds client traffic
//! until then, and translates client requests into service commands.

use bytes::Bytes;
use metrics::counter;
use parley_core::{Envelope, EnvelopeKind, RelayError};
use parley_protocol::{ClientRequest, ServerEvent, SessionBootstrap, SessionConfig, UpstreamCommand};
use tracing::{debug, info, trace, warn};

use super::endpoint::{EndpointLink, Inbound, InboundPolicy, OutboundPolicy};
use super::frame::Frame;
use crate::metrics as names;

/// Read-to-write notifications on the upstream endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamSignal {
    /// The service sent `session.created`.
    SessionCreated,
    /// The in-flight response completed or failed.
    ResponseFinished,
}

/// Read policy for the upstream socket.
#[derive(Debug, Default)]
pub struct UpstreamInbound;

impl InboundPolicy for UpstreamInbound {
    type Signal = UpstreamSignal;

    fn on_frame(
        &mut self,
        link: &EndpointLink,
        _kind: EnvelopeKind,
        payload: Bytes,
    ) -> Inbound<UpstreamSignal> {
        let event = match ServerEvent::decode(&payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    error = %e,
                    category = %e.category(),
                    len = payload.len(),
                    "undecodable upstream frame dropped"
                );
                counter!(names::DECODE_ERRORS_TOTAL, "role" => "upstream").increment(1);
                return Inbound::drop_frame();
            }
        };

        match &event {
            ServerEvent::SessionCreated => info!("upstream session created"),
            ServerEvent::SessionUpdated => info!("upstream session configured"),
            ServerEvent::ResponseCreate | ServerEvent::ResponseCreated => {
                info!(event = event.event_type(), "response started");
            }
            ServerEvent::ResponseDone => info!("response done"),
            ServerEvent::Error { detail } => {
                let e = RelayError::Upstream(detail.to_string());
                warn!(error = %e, category = %e.category(), "upstream error event");
                counter!(names::UPSTREAM_ERRORS_TOTAL).increment(1);
            }
            ServerEvent::AudioDelta { delta } => trace!(len = delta.len(), "audio delta"),
            ServerEvent::AudioTranscriptDelta { delta } => {
                debug!(delta = %delta, "transcript delta");
            }
            ServerEvent::Passthrough { event_type, .. } => {
                debug!(event = %event_type, "upstream event");
            }
        }

        // decoded events reach the client as text whatever frame carried them
        let inbound = Inbound::forward(link.envelope(EnvelopeKind::Text, payload));
        if matches!(event, ServerEvent::SessionCreated) {
            inbound.with_signal(UpstreamSignal::SessionCreated)
        } else if event.ends_response() {
            inbound.with_signal(UpstreamSignal::ResponseFinished)
        } else {
            inbound
        }
    }
}

/// Write policy for the upstream socket.
#[derive(Debug)]
pub struct UpstreamOutbound {
    bootstrap: SessionBootstrap,
}

impl UpstreamOutbound {
    /// Policy for a freshly dialed socket.
    pub fn new(config: SessionConfig) -> Self {
        let mut bootstrap = SessionBootstrap::new(config);
        bootstrap.on_dialed();
        Self { bootstrap }
    }

    fn encode(command: &UpstreamCommand) -> Vec<Frame> {
        match command.to_json() {
            Ok(json) => {
                debug!(command = command.kind(), "sending upstream command");
                vec![Frame::Text(json)]
            }
            Err(e) => {
                warn!(error = %e, command = command.kind(), "failed to encode upstream command");
                Vec::new()
            }
        }
    }
}

impl OutboundPolicy for UpstreamOutbound {
    type Signal = UpstreamSignal;

    fn accepts_queue(&self) -> bool {
        self.bootstrap.accepts_client_traffic()
    }

    fn on_envelope(&mut self, envelope: Envelope) -> Vec<Frame> {
        let request = match ClientRequest::parse(&envelope.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    error = %e,
                    category = %e.category(),
                    sender = %envelope.sender,
                    "undecodable client message dropped"
                );
                counter!(names::DECODE_ERRORS_TOTAL, "role" => "client").increment(1);
                return Vec::new();
            }
        };
        match self.bootstrap.on_client_request(&request) {
            Some(command) => Self::encode(&command),
            None => {
                debug!(kind = request.kind(), "client message has no upstream counterpart");
                Vec::new()
            }
        }
    }

    fn on_signal(&mut self, signal: UpstreamSignal) -> Vec<Frame> {
        match signal {
            UpstreamSignal::SessionCreated => self
                .bootstrap
                .on_session_created()
                .map(|command| Self::encode(&command))
                .unwrap_or_default(),
            UpstreamSignal::ResponseFinished => {
                self.bootstrap.on_response_finished();
                Vec::new()
            }
        }
    }

    fn on_close(&mut self) {
        self.bootstrap.close();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
