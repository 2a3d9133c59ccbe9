//! One relayed session: a client socket paired with an upstream socket.

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use parley_core::{Result, Role, SessionIds};
use parley_protocol::SessionConfig;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::{ClientInbound, ClientOutbound};
use super::endpoint::{EndpointLink, inbound_pump, outbound_pump};
use super::frame::Duplex;
use super::upstream::{UpstreamInbound, UpstreamOutbound};
use crate::hub::HubHandle;
use crate::keepalive::Keepalive;
use crate::metrics as names;

/// Capacity of the read-to-write signal channel on the upstream endpoint.
const SIGNAL_CAPACITY: usize = 16;

/// Everything a session needs from the server.
#[derive(Clone, Debug)]
pub struct SessionContext {
    /// Hub the endpoints register with.
    pub hub: HubHandle,
    /// Write deadline and ping cadence.
    pub keepalive: Keepalive,
    /// Outbound queue capacity per endpoint.
    pub queue_capacity: usize,
    /// Sent as `session.update` once the service announces the session.
    pub session_config: SessionConfig,
    /// Server-wide shutdown; each session runs under a child of it.
    pub shutdown: CancellationToken,
}

/// Run a session until either side closes or the server shuts down.
///
/// Both endpoints are registered before any pump starts, so nothing can be
/// dispatched to an id the hub does not know yet.
#[instrument(skip_all, fields(client_id = %ids.client, upstream_id = %ids.upstream))]
pub async fn run_session(ctx: SessionContext, ids: SessionIds, client: Duplex, upstream: Duplex) {
    let cancel = ctx.shutdown.child_token();
    let started = Instant::now();
    counter!(names::SESSIONS_TOTAL).increment(1);
    gauge!(names::SESSIONS_ACTIVE).increment(1.0);
    info!("session started");

    if let Err(e) = relay(&ctx, &ids, &cancel, client, upstream).await {
        warn!(error = %e, category = %e.category(), "session setup failed");
        cancel.cancel();
    }

    gauge!(names::SESSIONS_ACTIVE).decrement(1.0);
    histogram!(names::SESSION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    info!(duration_ms = started.elapsed().as_millis(), "session ended");
}

async fn relay(
    ctx: &SessionContext,
    ids: &SessionIds,
    cancel: &CancellationToken,
    (client_sink, client_stream): Duplex,
    (upstream_sink, upstream_stream): Duplex,
) -> Result<()> {
    let register = |role| {
        EndpointLink::register(&ctx.hub, ids, role, cancel, ctx.keepalive, ctx.queue_capacity)
    };
    let (client, client_queue) = register(Role::Client).await?;
    let (upstream, upstream_queue) = match register(Role::Upstream).await {
        Ok(registered) => registered,
        Err(e) => {
            client.shutdown().await;
            return Err(e);
        }
    };

    let (client_signals_tx, client_signals_rx) = mpsc::channel(1);
    let (upstream_signals_tx, upstream_signals_rx) = mpsc::channel(SIGNAL_CAPACITY);

    let mut pumps = JoinSet::new();
    let _ = pumps.spawn(inbound_pump(
        client.clone(),
        client_stream,
        ClientInbound,
        client_signals_tx,
    ));
    let _ = pumps.spawn(outbound_pump(
        client,
        client_sink,
        client_queue,
        client_signals_rx,
        ClientOutbound,
    ));
    let _ = pumps.spawn(inbound_pump(
        upstream.clone(),
        upstream_stream,
        UpstreamInbound,
        upstream_signals_tx,
    ));
    let _ = pumps.spawn(outbound_pump(
        upstream,
        upstream_sink,
        upstream_queue,
        upstream_signals_rx,
        UpstreamOutbound::new(ctx.session_config.clone()),
    ));

    while let Some(joined) = pumps.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "pump task failed");
            cancel.cancel();
        }
    }
    debug!("all pumps stopped");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Hub, HubStats};
    use crate::websocket::frame::{Frame, memory};
    use futures::StreamExt;
    use serde_json::Value;

    fn context(hub: HubHandle, shutdown: &CancellationToken) -> SessionContext {
        SessionContext {
            hub,
            keepalive: Keepalive::default(),
            queue_capacity: 8,
            session_config: SessionConfig::default(),
            shutdown: shutdown.clone(),
        }
    }

    async fn next_json(remote: &mut memory::Remote) -> Value {
        loop {
            match remote.written.next().await {
                Some(Frame::Text(json)) => return serde_json::from_str(&json).unwrap(),
                Some(Frame::Ping(_)) => {}
                other => panic!("unexpected frame {other:?}"),
            }
        }
    }

    fn send(remote: &memory::Remote, json: &str) {
        remote
            .incoming
            .unbounded_send(Ok(Frame::Text(json.to_owned())))
            .unwrap();
    }

    #[tokio::test]
    async fn full_conversation_round_trip() {
        let (hub, handle) = Hub::new(16);
        let shutdown = CancellationToken::new();
        let _ = tokio::spawn(hub.run(shutdown.clone()));
        let (client, mut client_remote) = memory::duplex();
        let (upstream, mut upstream_remote) = memory::duplex();
        let session = tokio::spawn(run_session(
            context(handle.clone(), &shutdown),
            SessionIds::generate(),
            client,
            upstream,
        ));

        // audio sent before the session exists is held, not lost
        send(&client_remote, r#"{"type":"input_audio_buffer.append","audio":"QUJD"}"#);
        send(&upstream_remote, r#"{"type":"session.created","session":{"id":"sess_1"}}"#);

        let update = next_json(&mut upstream_remote).await;
        assert_eq!(update["type"], "session.update");
        assert_eq!(update["session"]["modalities"], serde_json::json!(["audio", "text"]));
        let append = next_json(&mut upstream_remote).await;
        assert_eq!(append["type"], "input_audio_buffer.append");
        assert_eq!(append["audio"], "QUJD");

        assert_eq!(next_json(&mut client_remote).await["type"], "session.created");

        send(&client_remote, r#"{"type":"response.create","response":{"instructions":"hi"}}"#);
        let create = next_json(&mut upstream_remote).await;
        assert_eq!(create["type"], "response.create");
        assert_eq!(create["response"]["commit"], true);

        send(&upstream_remote, r#"{"type":"response.audio.delta","delta":"AAAA"}"#);
        send(&upstream_remote, r#"{"type":"response.done"}"#);
        assert_eq!(next_json(&mut client_remote).await["delta"], "AAAA");
        assert_eq!(next_json(&mut client_remote).await["type"], "response.done");

        assert_eq!(handle.stats().await.unwrap(), HubStats { clients: 1, upstreams: 1 });

        // client leaves; the upstream socket is closed too
        client_remote.incoming.unbounded_send(Ok(Frame::Close)).unwrap();
        session.await.unwrap();
        let mut closes = upstream_remote
            .written
            .filter(|f| futures::future::ready(*f == Frame::Close));
        assert_eq!(closes.next().await, Some(Frame::Close));
        assert_eq!(handle.stats().await.unwrap(), HubStats::default());
    }

    #[tokio::test]
    async fn upstream_failure_closes_client() {
        let (hub, handle) = Hub::new(16);
        let shutdown = CancellationToken::new();
        let _ = tokio::spawn(hub.run(shutdown.clone()));
        let (client, client_remote) = memory::duplex();
        let (upstream, upstream_remote) = memory::duplex();
        let session = tokio::spawn(run_session(
            context(handle.clone(), &shutdown),
            SessionIds::generate(),
            client,
            upstream,
        ));

        upstream_remote
            .incoming
            .unbounded_send(Err(parley_core::RelayError::transport("connection reset")))
            .unwrap();
        session.await.unwrap();

        let written: Vec<Frame> = client_remote.written.collect().await;
        assert_eq!(written.last(), Some(&Frame::Close));
        assert_eq!(handle.stats().await.unwrap(), HubStats::default());
    }

    #[tokio::test]
    async fn server_shutdown_ends_session() {
        let (hub, handle) = Hub::new(16);
        let hub_shutdown = CancellationToken::new();
        let _ = tokio::spawn(hub.run(hub_shutdown.clone()));
        let server_shutdown = CancellationToken::new();
        let (client, _client_remote) = memory::duplex();
        let (upstream, _upstream_remote) = memory::duplex();
        let session = tokio::spawn(run_session(
            context(handle, &server_shutdown),
            SessionIds::generate(),
            client,
            upstream,
        ));

        server_shutdown.cancel();
        session.await.unwrap();
    }

    #[tokio::test]
    async fn stopped_hub_fails_setup_without_hanging() {
        let (hub, handle) = Hub::new(16);
        drop(hub);
        let shutdown = CancellationToken::new();
        let (client, _c) = memory::duplex();
        let (upstream, _u) = memory::duplex();
        run_session(context(handle, &shutdown), SessionIds::generate(), client, upstream).await;
    }
}
