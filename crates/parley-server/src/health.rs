//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

use crate::hub::HubStats;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered endpoints, both roles.
    pub connections: usize,
    /// Live relayed sessions.
    pub active_sessions: usize,
}

/// Build a health response from hub counters.
///
/// Every session registers exactly one client endpoint, so the client count
/// is the session count.
pub fn health_check(start_time: Instant, stats: HubStats) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: stats.connections(),
        active_sessions: stats.clients,
    }
}
