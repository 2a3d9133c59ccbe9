//! Per-session configuration state machine.
//!
//! ```text
//! Connecting ──dialed──▶ AwaitingSessionCreated ──session.created──▶ Active
//!                                                                   │    ▲
//!                                                   response.create │    │ response.done / error
//!                                                                   ▼    │
//!                                                              ResponseInFlight
//! any state ──close──▶ Closed
//! ```
//!
//! The `session.update` is produced exactly once, on the first
//! `session.created`. Client traffic is only translated once the session is
//! configured, so nothing reaches the service ahead of the configuration.

use tracing::debug;

use crate::client::ClientRequest;
use crate::translate::{session_update, translate};
use crate::upstream::{SessionConfig, UpstreamCommand};

/// Lifecycle state of one upstream session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Dial in progress.
    Connecting,
    /// Socket open, waiting for `session.created`.
    AwaitingSessionCreated,
    /// Configured and idle.
    Active,
    /// A response has been requested and not yet finished.
    ResponseInFlight,
    /// Socket closed. Terminal.
    Closed,
}

/// Drives one upstream session from dial to close.
#[derive(Debug)]
pub struct SessionBootstrap {
    state: SessionState,
    config: SessionConfig,
}

impl SessionBootstrap {
    /// Start in [`SessionState::Connecting`] with the configuration to send.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: SessionState::Connecting,
            config,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether client commands may be sent upstream now.
    pub fn accepts_client_traffic(&self) -> bool {
        matches!(
            self.state,
            SessionState::Active | SessionState::ResponseInFlight
        )
    }

    /// Whether the session has reached [`SessionState::Closed`].
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// The upstream socket is open.
    pub fn on_dialed(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::AwaitingSessionCreated;
        }
    }

    /// The service announced the session.
    ///
    /// Returns the `session.update` to send the first time; later
    /// announcements are ignored.
    pub fn on_session_created(&mut self) -> Option<UpstreamCommand> {
        match self.state {
            SessionState::Connecting | SessionState::AwaitingSessionCreated => {
                self.state = SessionState::Active;
                Some(session_update(self.config.clone()))
            }
            state => {
                debug!(?state, "duplicate session.created ignored");
                None
            }
        }
    }

    /// Translate a client request, tracking response lifecycle.
    ///
    /// Returns `None` if the request has no upstream counterpart or the
    /// session is not accepting traffic. A response request while another
    /// is in flight is still forwarded.
    pub fn on_client_request(&mut self, request: &ClientRequest) -> Option<UpstreamCommand> {
        if !self.accepts_client_traffic() {
            debug!(
                state = ?self.state,
                kind = request.kind(),
                "client request before session is configured"
            );
            return None;
        }
        let command = translate(request)?;
        if request.starts_response() {
            if self.state == SessionState::ResponseInFlight {
                debug!("response.create while a response is in flight, forwarding");
            }
            self.state = SessionState::ResponseInFlight;
        }
        Some(command)
    }

    /// The in-flight response completed or failed.
    pub fn on_response_finished(&mut self) {
        if self.state == SessionState::ResponseInFlight {
            self.state = SessionState::Active;
        }
    }

    /// The socket closed or errored.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn configured() -> SessionBootstrap {
        let mut boot = SessionBootstrap::new(SessionConfig::default());
        boot.on_dialed();
        let _ = boot.on_session_created();
        boot
    }

    fn create_response() -> ClientRequest {
        ClientRequest::CreateResponse {
            instructions: Some("go".into()),
            modalities: vec![],
        }
    }

    #[test]
    fn starts_connecting_and_rejects_traffic() {
        let boot = SessionBootstrap::new(SessionConfig::default());
        assert_eq!(boot.state(), SessionState::Connecting);
        assert!(!boot.accepts_client_traffic());
    }

    #[test]
    fn dial_moves_to_awaiting() {
        let mut boot = SessionBootstrap::new(SessionConfig::default());
        boot.on_dialed();
        assert_eq!(boot.state(), SessionState::AwaitingSessionCreated);
        assert!(!boot.accepts_client_traffic());
    }

    #[test]
    fn session_created_emits_one_update() {
        let mut boot = SessionBootstrap::new(SessionConfig::default());
        boot.on_dialed();
        let first = boot.on_session_created();
        assert_matches!(first, Some(UpstreamCommand::SessionUpdate { .. }));
        assert_eq!(boot.state(), SessionState::Active);

        assert_eq!(boot.on_session_created(), None);
        assert_eq!(boot.state(), SessionState::Active);
    }

    #[test]
    fn session_created_during_response_is_ignored() {
        let mut boot = configured();
        let _ = boot.on_client_request(&create_response());
        assert_eq!(boot.on_session_created(), None);
        assert_eq!(boot.state(), SessionState::ResponseInFlight);
    }

    #[test]
    fn traffic_before_configuration_is_withheld() {
        let mut boot = SessionBootstrap::new(SessionConfig::default());
        boot.on_dialed();
        let req = ClientRequest::AppendAudio {
            audio: "QUJD".into(),
        };
        assert_eq!(boot.on_client_request(&req), None);
        assert_eq!(boot.state(), SessionState::AwaitingSessionCreated);
    }

    #[test]
    fn response_lifecycle() {
        let mut boot = configured();
        let cmd = boot.on_client_request(&create_response());
        assert_matches!(cmd, Some(UpstreamCommand::ResponseCreate { .. }));
        assert_eq!(boot.state(), SessionState::ResponseInFlight);

        boot.on_response_finished();
        assert_eq!(boot.state(), SessionState::Active);
    }

    #[test]
    fn second_response_create_is_forwarded() {
        let mut boot = configured();
        let _ = boot.on_client_request(&create_response());
        let again = boot.on_client_request(&create_response());
        assert!(again.is_some());
        assert_eq!(boot.state(), SessionState::ResponseInFlight);
    }

    #[test]
    fn audio_does_not_change_state() {
        let mut boot = configured();
        let cmd = boot.on_client_request(&ClientRequest::AppendAudio {
            audio: "QUJD".into(),
        });
        assert_eq!(
            cmd,
            Some(UpstreamCommand::InputAudioBufferAppend {
                audio: "QUJD".into()
            })
        );
        assert_eq!(boot.state(), SessionState::Active);
    }

    #[test]
    fn unsupported_request_is_dropped_without_transition() {
        let mut boot = configured();
        let req = ClientRequest::Unsupported { kind: "x".into() };
        assert_eq!(boot.on_client_request(&req), None);
        assert_eq!(boot.state(), SessionState::Active);
    }

    #[test]
    fn response_finished_when_idle_is_noop() {
        let mut boot = configured();
        boot.on_response_finished();
        assert_eq!(boot.state(), SessionState::Active);
    }

    #[test]
    fn close_is_terminal() {
        let mut boot = configured();
        boot.close();
        assert!(boot.is_closed());
        assert!(!boot.accepts_client_traffic());
        assert_eq!(boot.on_session_created(), None);
        boot.on_dialed();
        boot.on_response_finished();
        assert_eq!(boot.state(), SessionState::Closed);
        assert_eq!(boot.on_client_request(&create_response()), None);
    }
}
