//! Read and write pumps shared by both endpoint roles.
//!
//! The read pump owns the socket's read half and hands every data frame to
//! an [`InboundPolicy`]; whatever the policy returns is dispatched through
//! the hub. The write pump owns the write half and is the only writer on
//! its socket: queued envelopes, policy signals and keepalive pings all go
//! through it, each write bounded by the write timeout.
//!
//! Either pump exiting for any reason unregisters the session, which closes
//! both queues and cancels the other three pumps.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use metrics::counter;
use parley_core::{ConnectionId, Envelope, EnvelopeKind, RelayError, Result, Role, SessionIds};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::frame::{Frame, FrameSink, FrameStream};
use crate::hub::{EndpointHandle, HubHandle};
use crate::keepalive::Keepalive;
use crate::metrics as names;

/// One endpoint's identity and its connection to the hub.
#[derive(Clone, Debug)]
pub struct EndpointLink {
    /// This endpoint's id.
    pub id: ConnectionId,
    /// Paired endpoint's id.
    pub peer_id: ConnectionId,
    /// Side of the session.
    pub role: Role,
    /// Hub handle for dispatch and teardown.
    pub hub: HubHandle,
    /// Session cancellation token.
    pub cancel: CancellationToken,
    /// Write deadline and ping cadence.
    pub keepalive: Keepalive,
}

impl EndpointLink {
    /// Create the endpoint's outbound queue and register it with the hub.
    ///
    /// Returns the link and the consumer half of the queue; the hub keeps
    /// the only producer.
    pub async fn register(
        hub: &HubHandle,
        ids: &SessionIds,
        role: Role,
        cancel: &CancellationToken,
        keepalive: Keepalive,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<Envelope>)> {
        let (queue, rx) = mpsc::channel(capacity.max(1));
        let link = Self {
            id: ids.own(role).clone(),
            peer_id: ids.peer(role).clone(),
            role,
            hub: hub.clone(),
            cancel: cancel.clone(),
            keepalive,
        };
        hub.register(EndpointHandle {
            id: link.id.clone(),
            peer_id: link.peer_id.clone(),
            role,
            queue,
            cancel: cancel.clone(),
        })
        .await?;
        Ok((link, rx))
    }

    /// Envelope from this endpoint to its peer.
    pub fn envelope(&self, kind: EnvelopeKind, payload: impl Into<Bytes>) -> Envelope {
        Envelope::new(self.id.clone(), self.peer_id.clone(), kind, payload)
    }

    /// Unregister the session and cancel its pumps. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        if let Err(e) = self
            .hub
            .unregister(self.role, self.id.clone(), self.peer_id.clone())
            .await
        {
            debug!(error = %e, "hub already stopped");
        }
        self.cancel.cancel();
    }
}

/// What an [`InboundPolicy`] makes of one frame.
#[derive(Debug)]
pub struct Inbound<S> {
    /// Envelope to dispatch to the peer.
    pub forward: Option<Envelope>,
    /// Signal for this endpoint's own write pump, delivered before `forward`.
    pub signal: Option<S>,
}

impl<S> Inbound<S> {
    /// Nothing to do.
    pub fn drop_frame() -> Self {
        Self {
            forward: None,
            signal: None,
        }
    }

    /// Forward an envelope without signalling.
    pub fn forward(envelope: Envelope) -> Self {
        Self {
            forward: Some(envelope),
            signal: None,
        }
    }

    /// Add a signal.
    #[must_use]
    pub fn with_signal(mut self, signal: S) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Role-specific handling of frames read off a socket.
pub trait InboundPolicy: Send + 'static {
    /// Message type sent to the write pump of the same endpoint.
    type Signal: Send + 'static;

    /// Handle one data frame.
    fn on_frame(
        &mut self,
        link: &EndpointLink,
        kind: EnvelopeKind,
        payload: Bytes,
    ) -> Inbound<Self::Signal>;
}

/// Role-specific handling of what a write pump sends.
pub trait OutboundPolicy: Send + 'static {
    /// Message type received from the read pump of the same endpoint.
    type Signal: Send + 'static;

    /// Whether queued envelopes may be consumed now. While `false` they stay queued.
    fn accepts_queue(&self) -> bool {
        true
    }

    /// Frames to write for a queued envelope.
    fn on_envelope(&mut self, envelope: Envelope) -> Vec<Frame>;

    /// Frames to write for a signal.
    fn on_signal(&mut self, signal: Self::Signal) -> Vec<Frame>;

    /// The pump is exiting.
    fn on_close(&mut self) {}
}

/// Read frames until close, error or cancellation.
#[instrument(skip_all, fields(role = %link.role, id = %link.id))]
pub async fn inbound_pump<P: InboundPolicy>(
    link: EndpointLink,
    mut stream: FrameStream,
    mut policy: P,
    signals: mpsc::Sender<P::Signal>,
) {
    loop {
        let next = tokio::select! {
            () = link.cancel.cancelled() => break,
            next = stream.next() => next,
        };

        let frame = match next {
            None => {
                debug!("stream ended");
                break;
            }
            Some(Err(e)) if e.is_fatal_to_session() => {
                warn!(error = %e, category = %e.category(), "read failed");
                break;
            }
            Some(Err(e)) => {
                debug!(error = %e, category = %e.category(), "frame skipped");
                continue;
            }
            Some(Ok(Frame::Close)) => {
                debug!("close frame received");
                break;
            }
            Some(Ok(frame)) => frame,
        };

        let Some((kind, payload)) = frame.into_data() else {
            continue;
        };

        let Inbound { forward, signal } = policy.on_frame(&link, kind, payload);
        if let Some(signal) = signal {
            if signals.send(signal).await.is_err() {
                debug!("write pump gone");
                break;
            }
        }
        if let Some(envelope) = forward {
            match link.hub.dispatch(link.role, envelope).await {
                Ok(()) => {}
                Err(e) if e.is_fatal_to_session() => {
                    warn!(error = %e, category = %e.category(), "dispatch failed");
                    break;
                }
                Err(e) => debug!(error = %e, category = %e.category(), "envelope dropped"),
            }
        }
    }
    link.shutdown().await;
}

/// Write queued envelopes, signals and pings until the queue closes, a write
/// fails or the session is cancelled.
#[instrument(skip_all, fields(role = %link.role, id = %link.id))]
pub async fn outbound_pump<P: OutboundPolicy>(
    link: EndpointLink,
    mut sink: FrameSink,
    mut queue: mpsc::Receiver<Envelope>,
    mut signals: mpsc::Receiver<P::Signal>,
    mut policy: P,
) {
    let keepalive = link.keepalive;
    let mut ticker = keepalive.ticker();
    let mut signals_open = true;
    let mut write_failed = false;

    loop {
        let accepts_queue = policy.accepts_queue();
        let frames = tokio::select! {
            biased;
            () = link.cancel.cancelled() => break,
            signal = signals.recv(), if signals_open => match signal {
                Some(signal) => policy.on_signal(signal),
                None => {
                    signals_open = false;
                    continue;
                }
            },
            _ = ticker.tick() => vec![Frame::Ping(Bytes::new())],
            envelope = queue.recv(), if accepts_queue => match envelope {
                Some(envelope) => policy.on_envelope(envelope),
                None => {
                    debug!("outbound queue closed");
                    break;
                }
            },
        };

        match write_frames(&mut sink, frames, &keepalive).await {
            Ok(()) => {}
            Err(e) if e.is_fatal_to_session() => {
                if matches!(e, RelayError::WriteTimeout(_)) {
                    counter!(names::WRITE_TIMEOUTS_TOTAL, "role" => link.role.to_string())
                        .increment(1);
                }
                warn!(error = %e, category = %e.category(), "write failed");
                write_failed = true;
                break;
            }
            Err(e) => debug!(error = %e, category = %e.category(), "frame not written"),
        }
    }

    policy.on_close();
    if !write_failed {
        let close = async {
            sink.send(Frame::Close).await?;
            sink.close().await
        };
        if let Ok(Err(e)) = tokio::time::timeout(keepalive.write_timeout, close).await {
            debug!(error = %e, "close handshake failed");
        }
    }
    link.shutdown().await;
}

async fn write_frames(
    sink: &mut FrameSink,
    frames: Vec<Frame>,
    keepalive: &Keepalive,
) -> Result<()> {
    for frame in frames {
        tokio::time::timeout(keepalive.write_timeout, sink.send(frame))
            .await
            .map_err(|_| RelayError::WriteTimeout(keepalive.write_timeout))??;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
