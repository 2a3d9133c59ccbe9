//! Package-level constants and timing defaults.

use std::time::Duration;

/// Current version of Parley (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "parley";

/// Capacity of each endpoint's outbound queue, in envelopes.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// Capacity of the hub's control channel.
pub const HUB_CONTROL_CAPACITY: usize = 256;

/// Time allowed for a single socket write.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted write, dial or shutdown timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Keepalive ping interval for a given write timeout (nine tenths of it).
pub fn ping_period(write_timeout: Duration) -> Duration {
    write_timeout.saturating_sub(write_timeout / 10)
}
