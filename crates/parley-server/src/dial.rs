//! Upstream connection seam.
//!
//! The server asks an [`UpstreamDialer`] for a connected socket once per
//! client upgrade. [`WsDialer`] is the production implementation; tests plug
//! in their own.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::constants::MAX_TIMEOUT_SECS;
use parley_core::{RelayError, Result};
use parley_settings::UpstreamSettings;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tracing::{debug, info, instrument};

use crate::websocket::frame::{self, Duplex};

/// Opens the upstream half of a session.
#[async_trait]
pub trait UpstreamDialer: Send + Sync {
    /// Connect to the realtime service.
    async fn dial(&self) -> Result<Duplex>;
}

/// Dials the configured realtime endpoint with an API key header.
#[derive(Clone)]
pub struct WsDialer {
    endpoint: String,
    api_key: String,
    api_key_header: String,
    connect_timeout: Duration,
}

impl std::fmt::Debug for WsDialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsDialer")
            .field("endpoint", &self.endpoint)
            .field("api_key_header", &self.api_key_header)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl WsDialer {
    /// Build from the `upstream` settings section.
    pub fn new(settings: &UpstreamSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            api_key_header: settings.api_key_header.clone(),
            connect_timeout: Duration::from_secs(
                settings.connect_timeout_secs.clamp(1, MAX_TIMEOUT_SECS),
            ),
        }
    }

    /// Endpoint URL this dialer connects to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UpstreamDialer for WsDialer {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn dial(&self) -> Result<Duplex> {
        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| RelayError::Config(format!("invalid upstream endpoint: {e}")))?;

        let name = HeaderName::from_bytes(self.api_key_header.as_bytes())
            .map_err(|e| RelayError::Config(format!("invalid api key header name: {e}")))?;
        let value = HeaderValue::from_str(&self.api_key)
            .map_err(|e| RelayError::Config(format!("invalid api key header value: {e}")))?;
        let _ = request.headers_mut().insert(name, value);

        debug!("dialing upstream");
        let (socket, response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| RelayError::dial(format!("timed out after {:?}", self.connect_timeout)))?
            .map_err(RelayError::dial)?;
        info!(status = %response.status(), "upstream connected");

        Ok(frame::from_tungstenite(socket))
    }
}
