//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file and
//! `#[serde(default)]` so a partial file only overrides what it names.

mod server;
mod session;
mod upstream;

pub use server::*;
pub use session::*;
pub use upstream::*;

use parley_core::constants::MAX_TIMEOUT_SECS;
use parley_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the relay.
///
/// Loaded from `~/.parley/settings.json` with defaults applied for missing
/// fields. Environment variables override specific values. Example:
///
/// ```json
/// {
///   "server": { "port": 6000 },
///   "upstream": { "endpoint": "wss://example.openai.azure.com/openai/realtime" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// Settings schema version.
    pub version: String,
    /// HTTP listener and per-connection limits.
    pub server: ServerSettings,
    /// Realtime service endpoint and credentials.
    pub upstream: UpstreamSettings,
    /// Session configuration sent in `session.update`.
    pub session: SessionSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for ParleySettings {
    fn default() -> Self {
        Self {
            version: parley_core::constants::VERSION.to_string(),
            server: ServerSettings::default(),
            upstream: UpstreamSettings::default(),
            session: SessionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ParleySettings {
    /// Reject settings no session could be created with.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.upstream.endpoint.trim();
        if endpoint.is_empty() {
            return Err(SettingsError::InvalidValue(
                "upstream.endpoint is empty (set AZURE_OPENAI_ENDPOINT)".into(),
            ));
        }
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(SettingsError::InvalidValue(format!(
                "upstream.endpoint must be a ws:// or wss:// URL, got {endpoint}"
            )));
        }
        if self.upstream.api_key.is_empty() {
            return Err(SettingsError::InvalidValue(
                "upstream.apiKey is empty (set AZURE_OPENAI_API_KEY)".into(),
            ));
        }
        if self.upstream.api_key_header.is_empty() {
            return Err(SettingsError::InvalidValue(
                "upstream.apiKeyHeader is empty".into(),
            ));
        }
        if self.server.queue_capacity == 0 || self.server.hub_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "queue capacities must be at least 1".into(),
            ));
        }
        check_secs("server.writeTimeoutSecs", self.server.write_timeout_secs, 1)?;
        check_secs("upstream.connectTimeoutSecs", self.upstream.connect_timeout_secs, 1)?;
        check_secs("server.shutdownGraceSecs", self.server.shutdown_grace_secs, 0)?;
        Ok(())
    }
}

fn check_secs(field: &str, value: u64, min: u64) -> Result<()> {
    if (min..=MAX_TIMEOUT_SECS).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::InvalidValue(format!(
            "{field} must be between {min} and {MAX_TIMEOUT_SECS}, got {value}"
        )))
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid() -> ParleySettings {
        let mut settings = ParleySettings::default();
        settings.upstream.endpoint = "wss://example.test/realtime".into();
        settings.upstream.api_key = "key".into();
        settings
    }

    #[test]
    fn validate_accepts_complete_settings() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_endpoint() {
        let mut settings = valid();
        settings.upstream.endpoint = "  ".into();
        assert_matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(m)) if m.contains("endpoint")
        );
    }

    #[test]
    fn validate_rejects_http_endpoint() {
        let mut settings = valid();
        settings.upstream.endpoint = "https://example.test".into();
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_rejects_missing_key() {
        let mut settings = valid();
        settings.upstream.api_key.clear();
        assert_matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(m)) if m.contains("apiKey")
        );
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut settings = valid();
        settings.server.queue_capacity = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_bounds_timeouts() {
        let mut settings = valid();
        settings.server.write_timeout_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = valid();
        settings.server.write_timeout_secs = u64::MAX / 1000;
        assert_matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(m)) if m.contains("writeTimeoutSecs")
        );

        let mut settings = valid();
        settings.upstream.connect_timeout_secs = 301;
        assert_matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(m)) if m.contains("connectTimeoutSecs")
        );

        let mut settings = valid();
        settings.server.shutdown_grace_secs = 0;
        assert!(settings.validate().is_ok());
        settings.server.shutdown_grace_secs = 3600;
        assert_matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(m)) if m.contains("shutdownGraceSecs")
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: ParleySettings =
            serde_json::from_str(r#"{"server": {"port": 7000}}"#).unwrap();
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.server.host, "localhost");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(ParleySettings::default()).unwrap();
        assert!(value["server"].get("queueCapacity").is_some());
        assert!(value["upstream"].get("apiKeyHeader").is_some());
        assert_eq!(value["logging"]["format"], "compact");
    }
}
