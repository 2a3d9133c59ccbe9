//! Session registry and envelope router.
//!
//! One [`Hub`] task owns two maps (client id → endpoint, upstream id →
//! endpoint) and is the only code that touches them. Every other task talks
//! to it through a cloneable [`HubHandle`] over one bounded FIFO channel.
//! Command handling is synchronous; the loop awaits nothing but its input.
//!
//! Dispatch never blocks: an envelope for a full or closed queue tears the
//! receiving endpoint down, and unregistering one side of a session always
//! closes the other side too.

use std::collections::HashMap;

use metrics::{counter, gauge};
use parley_core::{ConnectionId, Envelope, RelayError, Result, Role};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::metrics as names;

/// What the hub holds for one registered endpoint.
#[derive(Debug)]
pub struct EndpointHandle {
    /// The endpoint's own id.
    pub id: ConnectionId,
    /// Id of the paired endpoint.
    pub peer_id: ConnectionId,
    /// Which side of the session this endpoint is.
    pub role: Role,
    /// Producer half of the endpoint's outbound queue. The hub holds the only copy.
    pub queue: mpsc::Sender<Envelope>,
    /// Session cancellation token.
    pub cancel: CancellationToken,
}

impl EndpointHandle {
    /// Drop the queue producer and cancel the session.
    fn close(self) {
        self.cancel.cancel();
        drop(self.queue);
    }
}

/// Registration counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Registered client endpoints.
    pub clients: usize,
    /// Registered upstream endpoints.
    pub upstreams: usize,
}

impl HubStats {
    /// Total registered endpoints.
    pub fn connections(&self) -> usize {
        self.clients + self.upstreams
    }
}

/// Commands consumed by the hub loop.
#[derive(Debug)]
pub enum HubCommand {
    /// Add an endpoint; replaces any endpoint with the same id.
    Register(EndpointHandle),
    /// Remove an endpoint and its peer, closing both.
    Unregister {
        /// Role of the endpoint being removed.
        role: Role,
        /// Its id.
        id: ConnectionId,
        /// Its peer's id.
        peer_id: ConnectionId,
    },
    /// Route an envelope to the counterpart of `from`.
    Dispatch {
        /// Role of the sending endpoint.
        from: Role,
        /// The envelope to deliver.
        envelope: Envelope,
    },
    /// Report registration counts.
    Stats(oneshot::Sender<HubStats>),
    /// Report the peer id registered for an endpoint.
    ResolvePeer {
        /// Role of the endpoint to look up.
        role: Role,
        /// Its id.
        id: ConnectionId,
        /// Where to send the answer.
        reply: oneshot::Sender<Option<ConnectionId>>,
    },
}

/// Cloneable sender side of the hub's control channel.
#[derive(Clone, Debug)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    async fn send(&self, command: HubCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| RelayError::HubClosed)
    }

    /// Register an endpoint.
    pub async fn register(&self, endpoint: EndpointHandle) -> Result<()> {
        self.send(HubCommand::Register(endpoint)).await
    }

    /// Unregister an endpoint and its peer. Repeated calls are no-ops.
    pub async fn unregister(
        &self,
        role: Role,
        id: ConnectionId,
        peer_id: ConnectionId,
    ) -> Result<()> {
        self.send(HubCommand::Unregister { role, id, peer_id }).await
    }

    /// Hand an envelope to the hub for delivery.
    pub async fn dispatch(&self, from: Role, envelope: Envelope) -> Result<()> {
        self.send(HubCommand::Dispatch { from, envelope }).await
    }

    /// Current registration counts.
    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats(reply)).await?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }

    /// Peer id registered for `id`, if `id` is registered under `role`.
    pub async fn resolve_peer(
        &self,
        role: Role,
        id: ConnectionId,
    ) -> Result<Option<ConnectionId>> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::ResolvePeer { role, id, reply }).await?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }
}

/// The control loop.
pub struct Hub {
    rx: mpsc::Receiver<HubCommand>,
    clients: HashMap<ConnectionId, EndpointHandle>,
    upstreams: HashMap<ConnectionId, EndpointHandle>,
}

impl Hub {
    /// Create a hub and its handle. The control channel holds `capacity` commands.
    pub fn new(capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let hub = Self {
            rx,
            clients: HashMap::new(),
            upstreams: HashMap::new(),
        };
        (hub, HubHandle { tx })
    }

    /// Run until `shutdown` fires or every handle is dropped, then close all endpoints.
    #[instrument(skip_all, name = "hub")]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("hub started");
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
        self.close_all();
        info!("hub stopped");
    }

    /// Apply one command.
    pub fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(endpoint) => self.register(endpoint),
            HubCommand::Unregister { role, id, peer_id } => self.unregister(role, &id, &peer_id),
            HubCommand::Dispatch { from, envelope } => self.dispatch(from, envelope),
            HubCommand::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            HubCommand::ResolvePeer { role, id, reply } => {
                let peer = self.registry(role).get(&id).map(|e| e.peer_id.clone());
                let _ = reply.send(peer);
            }
        }
    }

    /// Current registration counts.
    pub fn stats(&self) -> HubStats {
        HubStats {
            clients: self.clients.len(),
            upstreams: self.upstreams.len(),
        }
    }

    fn registry(&self, role: Role) -> &HashMap<ConnectionId, EndpointHandle> {
        match role {
            Role::Client => &self.clients,
            Role::Upstream => &self.upstreams,
        }
    }

    fn registry_mut(&mut self, role: Role) -> &mut HashMap<ConnectionId, EndpointHandle> {
        match role {
            Role::Client => &mut self.clients,
            Role::Upstream => &mut self.upstreams,
        }
    }

    fn register(&mut self, endpoint: EndpointHandle) {
        let role = endpoint.role;
        let id = endpoint.id.clone();
        debug!(%role, %id, peer_id = %endpoint.peer_id, "endpoint registered");
        if let Some(previous) = self.registry_mut(role).insert(id.clone(), endpoint) {
            warn!(%role, %id, "endpoint re-registered, closing previous");
            previous.close();
        }
        self.record_gauges();
    }

    fn unregister(&mut self, role: Role, id: &ConnectionId, peer_id: &ConnectionId) {
        let own = self.remove(role, id);
        let peer = self.remove(role.counterpart(), peer_id);
        if own || peer {
            info!(%role, %id, %peer_id, "session unregistered");
            self.record_gauges();
        }
    }

    /// Remove and close one endpoint. Returns whether it was present.
    fn remove(&mut self, role: Role, id: &ConnectionId) -> bool {
        match self.registry_mut(role).remove(id) {
            Some(endpoint) => {
                endpoint.close();
                true
            }
            None => false,
        }
    }

    fn dispatch(&mut self, from: Role, envelope: Envelope) {
        let to = from.counterpart();
        let receiver = envelope.receiver.clone();
        let Some(endpoint) = self.registry(to).get(&receiver) else {
            warn!(
                %from,
                sender = %envelope.sender,
                %receiver,
                "no endpoint for receiver, dropping envelope"
            );
            counter!(names::ENVELOPES_DROPPED_TOTAL, "reason" => "unknown_receiver").increment(1);
            return;
        };

        match endpoint.queue.try_send(envelope) {
            Ok(()) => {
                counter!(names::ENVELOPES_ROUTED_TOTAL, "to" => to.to_string()).increment(1);
            }
            Err(err) => {
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => {
                        RelayError::QueueFull(receiver.to_string())
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        RelayError::transport(format!("queue closed for {receiver}"))
                    }
                };
                warn!(error = %reason, category = %reason.category(), "disconnecting slow peer");
                counter!(names::SLOW_PEER_DISCONNECTS_TOTAL).increment(1);
                let peer_id = endpoint.peer_id.clone();
                self.unregister(to, &receiver, &peer_id);
            }
        }
    }

    fn close_all(&mut self) {
        let count = self.clients.len() + self.upstreams.len();
        for (_, endpoint) in self.clients.drain().chain(self.upstreams.drain()) {
            endpoint.close();
        }
        if count > 0 {
            info!(count, "closed remaining endpoints");
        }
        self.record_gauges();
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_gauges(&self) {
        gauge!(names::ENDPOINTS_REGISTERED, "role" => "client").set(self.clients.len() as f64);
        gauge!(names::ENDPOINTS_REGISTERED, "role" => "upstream").set(self.upstreams.len() as f64);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
