//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parley_core::RelayError;
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup, before any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, RelayError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| RelayError::Config(format!("failed to install metrics recorder: {e}")))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants shared by the hub, pumps and router.

/// Sessions created total (counter).
pub const SESSIONS_TOTAL: &str = "parley_sessions_total";
/// Live sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "parley_sessions_active";
/// Session lifetime seconds (histogram).
pub const SESSION_DURATION_SECONDS: &str = "parley_session_duration_seconds";
/// Endpoints registered with the hub (gauge, labels: role).
pub const ENDPOINTS_REGISTERED: &str = "parley_endpoints_registered";
/// Envelopes delivered to an outbound queue (counter, labels: to).
pub const ENVELOPES_ROUTED_TOTAL: &str = "parley_envelopes_routed_total";
/// Envelopes dropped before delivery (counter, labels: reason).
pub const ENVELOPES_DROPPED_TOTAL: &str = "parley_envelopes_dropped_total";
/// Endpoints torn down for a full or closed queue (counter).
pub const SLOW_PEER_DISCONNECTS_TOTAL: &str = "parley_slow_peer_disconnects_total";
/// Failed upstream dials (counter).
pub const UPSTREAM_DIAL_FAILURES_TOTAL: &str = "parley_upstream_dial_failures_total";
/// Error events reported by the upstream service (counter).
pub const UPSTREAM_ERRORS_TOTAL: &str = "parley_upstream_errors_total";
/// Frames that failed to decode (counter, labels: role).
pub const DECODE_ERRORS_TOTAL: &str = "parley_decode_errors_total";
/// Socket writes that hit the write timeout (counter, labels: role).
pub const WRITE_TIMEOUTS_TOTAL: &str = "parley_write_timeouts_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_render() {
        // Build a recorder + handle without the global install.
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = render(&handle);
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_prefixed_snake_case() {
        let names = [
            SESSIONS_TOTAL,
            SESSIONS_ACTIVE,
            SESSION_DURATION_SECONDS,
            ENDPOINTS_REGISTERED,
            ENVELOPES_ROUTED_TOTAL,
            ENVELOPES_DROPPED_TOTAL,
            SLOW_PEER_DISCONNECTS_TOTAL,
            UPSTREAM_DIAL_FAILURES_TOTAL,
            UPSTREAM_ERRORS_TOTAL,
            DECODE_ERRORS_TOTAL,
            WRITE_TIMEOUTS_TOTAL,
        ];
        for name in names {
            assert!(name.starts_with("parley_"), "{name}");
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
