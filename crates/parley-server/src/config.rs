//! Server configuration.

use std::time::Duration;

use parley_core::constants::MAX_TIMEOUT_SECS;
use parley_protocol::{SessionConfig, TurnDetection, templates};
use parley_settings::{ServerSettings, SessionSettings};

use crate::keepalive::Keepalive;

/// Runtime configuration for [`crate::ParleyServer`].
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Capacity of each endpoint's outbound queue.
    pub queue_capacity: usize,
    /// Capacity of the hub's control channel.
    pub hub_capacity: usize,
    /// Budget for a single socket write.
    pub write_timeout: Duration,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
    /// How long shutdown waits for sessions to drain.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            queue_capacity: parley_core::constants::OUTBOUND_QUEUE_CAPACITY,
            hub_capacity: parley_core::constants::HUB_CONTROL_CAPACITY,
            write_timeout: parley_core::constants::WRITE_TIMEOUT,
            max_message_size: 16 * 1024 * 1024,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Build from the `server` settings section. Timeouts are clamped to
    /// `1..=MAX_TIMEOUT_SECS` seconds.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            queue_capacity: settings.queue_capacity.max(1),
            hub_capacity: settings.hub_capacity.max(1),
            write_timeout: Duration::from_secs(
                settings.write_timeout_secs.clamp(1, MAX_TIMEOUT_SECS),
            ),
            max_message_size: settings.max_message_size,
            shutdown_grace: Duration::from_secs(
                settings.shutdown_grace_secs.min(MAX_TIMEOUT_SECS),
            ),
        }
    }

    /// Write deadline and ping cadence for every endpoint.
    pub fn keepalive(&self) -> Keepalive {
        Keepalive::from_write_timeout(self.write_timeout)
    }
}

/// Build the `session.update` payload from the `session` settings section.
///
/// Unset instructions fall back to the built-in interview template.
pub fn session_config(settings: &SessionSettings) -> SessionConfig {
    SessionConfig {
        modalities: settings.modalities.clone(),
        instructions: settings
            .instructions
            .clone()
            .unwrap_or_else(|| templates::INTERVIEW_INSTRUCTIONS.to_string()),
        voice: settings.voice.clone(),
        input_audio_format: settings.input_audio_format.clone(),
        output_audio_format: settings.output_audio_format.clone(),
        temperature: settings.temperature,
        turn_detection: TurnDetection {
            kind: settings.turn_detection.clone(),
        },
    }
}
