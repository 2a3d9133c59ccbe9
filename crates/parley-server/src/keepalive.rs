//! Write deadline and ping cadence shared by every endpoint.
//!
//! Each outbound pump pings its socket every [`Keepalive::ping_period`] and
//! bounds every write, pings included, by [`Keepalive::write_timeout`]. The
//! ping period is nine tenths of the write timeout so a ping is always sent
//! before a stalled write could be detected.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};

/// Upper bound on the ticker period, far beyond any accepted write timeout.
const LONGEST_PING_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Write deadline and ping period for one endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keepalive {
    /// Budget for a single socket write.
    pub write_timeout: Duration,
    /// Interval between pings.
    pub ping_period: Duration,
}

impl Keepalive {
    /// Derive the ping period from a write timeout.
    pub fn from_write_timeout(write_timeout: Duration) -> Self {
        Self {
            write_timeout,
            ping_period: parley_core::constants::ping_period(write_timeout),
        }
    }

    /// Ticker whose first tick fires one full period from now.
    pub fn ticker(&self) -> Interval {
        let period = self.ping_period.clamp(Duration::from_millis(1), LONGEST_PING_PERIOD);
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::from_write_timeout(parley_core::constants::WRITE_TIMEOUT)
    }
}
