//! HTTP listener and connection limits.

use serde::{Deserialize, Serialize};

/// Listener and per-connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Capacity of each endpoint's outbound queue, in envelopes.
    pub queue_capacity: usize,
    /// Capacity of the hub's control channel.
    pub hub_capacity: usize,
    /// Budget for a single socket write, in seconds. Pings go out at 9/10 of it.
    pub write_timeout_secs: u64,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
    /// How long shutdown waits for sessions to drain, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5555,
            queue_capacity: parley_core::constants::OUTBOUND_QUEUE_CAPACITY,
            hub_capacity: parley_core::constants::HUB_CONTROL_CAPACITY,
            write_timeout_secs: parley_core::constants::WRITE_TIMEOUT.as_secs(),
            max_message_size: 16 * 1024 * 1024,
            shutdown_grace_secs: 10,
        }
    }
}
