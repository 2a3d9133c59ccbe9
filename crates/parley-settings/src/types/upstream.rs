//! Realtime service endpoint and credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where and how to dial the realtime service.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamSettings {
    /// Full `ws://` or `wss://` URL of the realtime endpoint.
    pub endpoint: String,
    /// API key sent on the dial request.
    pub api_key: String,
    /// Header carrying the API key.
    pub api_key_header: String,
    /// Dial timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_key_header: "api-key".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("UpstreamSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &key)
            .field("api_key_header", &self.api_key_header)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}
