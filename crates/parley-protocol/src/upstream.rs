//! Wire schema of the realtime conversation service.
//!
//! Outgoing traffic is a closed set of [`UpstreamCommand`]s serialised with
//! a `type` tag. Incoming traffic is decoded loosely into [`ServerEvent`]:
//! only the fields the relay acts on are read, and every other event type
//! is kept as [`ServerEvent::Passthrough`].

use std::fmt;

use bytes::Bytes;
use parley_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type names the relay recognises on the upstream socket.
pub mod event_types {
    /// Service has created the conversation session.
    pub const SESSION_CREATED: &str = "session.created";
    /// Service acknowledged a `session.update`.
    pub const SESSION_UPDATED: &str = "session.updated";
    /// Echo of a response request.
    pub const RESPONSE_CREATE: &str = "response.create";
    /// Service started producing a response.
    pub const RESPONSE_CREATED: &str = "response.created";
    /// Service finished a response.
    pub const RESPONSE_DONE: &str = "response.done";
    /// Service reported an error.
    pub const ERROR: &str = "error";
    /// Chunk of synthesised audio.
    pub const AUDIO_DELTA: &str = "response.audio.delta";
    /// Chunk of the audio transcript.
    pub const AUDIO_TRANSCRIPT_DELTA: &str = "response.audio_transcript.delta";
}

// ─────────────────────────────────────────────────────────────────────────────
// Outgoing commands
// ─────────────────────────────────────────────────────────────────────────────

/// Voice activity detection mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDetection {
    /// Detection strategy, e.g. `server_vad`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl TurnDetection {
    /// Server-side voice activity detection.
    pub fn server_vad() -> Self {
        Self {
            kind: "server_vad".into(),
        }
    }
}

/// Session configuration carried by `session.update`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Output modalities, e.g. `["audio", "text"]`.
    pub modalities: Vec<String>,
    /// System instructions for the model.
    pub instructions: String,
    /// Voice preset.
    pub voice: String,
    /// Format of audio the client sends.
    pub input_audio_format: String,
    /// Format of audio the service returns.
    pub output_audio_format: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Turn detection mode.
    pub turn_detection: TurnDetection,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            modalities: vec!["audio".into(), "text".into()],
            instructions: crate::templates::INTERVIEW_INSTRUCTIONS.into(),
            voice: "alloy".into(),
            input_audio_format: "pcm16".into(),
            output_audio_format: "pcm16".into(),
            temperature: 0.8,
            turn_detection: TurnDetection::server_vad(),
        }
    }
}

/// Parameters of a `response.create` command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOptions {
    /// Output modalities.
    pub modalities: Vec<String>,
    /// Per-response instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Commit the pending input buffer first.
    pub commit: bool,
    /// Cancel any response already in progress.
    pub cancel_previous: bool,
}

/// A command written to the upstream socket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpstreamCommand {
    /// Configure the session.
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// New session configuration.
        session: SessionConfig,
    },
    /// Append audio to the input buffer.
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio.
        audio: String,
    },
    /// Commit the input buffer.
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,
    /// Request a model response.
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response parameters.
        response: ResponseOptions,
    },
}

impl UpstreamCommand {
    /// Wire `type` of this command.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            Self::InputAudioBufferCommit => "input_audio_buffer.commit",
            Self::ResponseCreate { .. } => "response.create",
        }
    }

    /// Serialise to the JSON text frame body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Incoming events
// ─────────────────────────────────────────────────────────────────────────────

/// Error payload of an upstream `error` event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error class reported by the service.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorDetail {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(message) => Self {
                message: Some(message.clone()),
                ..Self::default()
            },
            Value::Object(_) => serde_json::from_value(value.clone()).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.as_deref().unwrap_or("unknown");
        match &self.code {
            Some(code) => write!(f, "{kind}/{code}")?,
            None => f.write_str(kind)?,
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawServerEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    delta: Option<String>,
}

/// An event received from the upstream socket.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    /// `session.created`
    SessionCreated,
    /// `session.updated`
    SessionUpdated,
    /// `response.create`
    ResponseCreate,
    /// `response.created`
    ResponseCreated,
    /// `response.done`
    ResponseDone,
    /// `error`
    Error {
        /// Extracted error payload.
        detail: ErrorDetail,
    },
    /// `response.audio.delta`
    AudioDelta {
        /// Base64 audio chunk.
        delta: String,
    },
    /// `response.audio_transcript.delta`
    AudioTranscriptDelta {
        /// Transcript fragment.
        delta: String,
    },
    /// Any other event type, kept verbatim.
    Passthrough {
        /// The event's `type` field.
        event_type: String,
        /// The frame as received.
        raw: Bytes,
    },
}

impl ServerEvent {
    /// Decode an upstream frame.
    ///
    /// Requires a JSON object with a string `type`; everything else is a
    /// decode error.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        use event_types as t;

        let raw: RawServerEvent = serde_json::from_slice(bytes)?;
        let event = match raw.kind.as_str() {
            t::SESSION_CREATED => Self::SessionCreated,
            t::SESSION_UPDATED => Self::SessionUpdated,
            t::RESPONSE_CREATE => Self::ResponseCreate,
            t::RESPONSE_CREATED => Self::ResponseCreated,
            t::RESPONSE_DONE => Self::ResponseDone,
            t::ERROR => {
                // Some deployments nest the error under `response.error`.
                let nested = raw.response.as_ref().and_then(|r| r.get("error"));
                let detail = raw
                    .error
                    .as_ref()
                    .or(nested)
                    .map(ErrorDetail::from_value)
                    .unwrap_or_default();
                Self::Error { detail }
            }
            t::AUDIO_DELTA => Self::AudioDelta {
                delta: raw.delta.unwrap_or_default(),
            },
            t::AUDIO_TRANSCRIPT_DELTA => Self::AudioTranscriptDelta {
                delta: raw.delta.unwrap_or_default(),
            },
            _ => Self::Passthrough {
                event_type: raw.kind,
                raw: Bytes::copy_from_slice(bytes),
            },
        };
        Ok(event)
    }

    /// Wire `type` of this event.
    pub fn event_type(&self) -> &str {
        use event_types as t;

        match self {
            Self::SessionCreated => t::SESSION_CREATED,
            Self::SessionUpdated => t::SESSION_UPDATED,
            Self::ResponseCreate => t::RESPONSE_CREATE,
            Self::ResponseCreated => t::RESPONSE_CREATED,
            Self::ResponseDone => t::RESPONSE_DONE,
            Self::Error { .. } => t::ERROR,
            Self::AudioDelta { .. } => t::AUDIO_DELTA,
            Self::AudioTranscriptDelta { .. } => t::AUDIO_TRANSCRIPT_DELTA,
            Self::Passthrough { event_type, .. } => event_type,
        }
    }

    /// Whether this event closes the response currently in flight.
    pub fn ends_response(&self) -> bool {
        matches!(self, Self::ResponseDone | Self::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use parley_core::RelayError;
    use serde_json::json;

    fn config() -> SessionConfig {
        SessionConfig {
            modalities: vec!["audio".into(), "text".into()],
            instructions: "be brief".into(),
            voice: "alloy".into(),
            input_audio_format: "pcm16".into(),
            output_audio_format: "pcm16".into(),
            temperature: 0.8,
            turn_detection: TurnDetection::server_vad(),
        }
    }

    // ── commands ────────────────────────────────────────────────────

    #[test]
    fn session_update_wire_shape() {
        let cmd = UpstreamCommand::SessionUpdate { session: config() };
        let value: Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "session.update");
        assert_eq!(value["session"]["voice"], "alloy");
        assert_eq!(value["session"]["modalities"], json!(["audio", "text"]));
        assert_eq!(value["session"]["input_audio_format"], "pcm16");
        assert_eq!(value["session"]["turn_detection"]["type"], "server_vad");
        assert_eq!(value["session"]["temperature"], 0.8);
    }

    #[test]
    fn commit_is_bare_type() {
        let json = UpstreamCommand::InputAudioBufferCommit.to_json().unwrap();
        assert_eq!(json, r#"{"type":"input_audio_buffer.commit"}"#);
    }

    #[test]
    fn response_create_omits_missing_instructions() {
        let cmd = UpstreamCommand::ResponseCreate {
            response: ResponseOptions {
                modalities: vec!["audio".into()],
                instructions: None,
                commit: true,
                cancel_previous: true,
            },
        };
        let value: Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();
        assert!(value["response"].get("instructions").is_none());
        assert_eq!(value["response"]["cancel_previous"], true);
    }

    #[test]
    fn command_kind_matches_tag() {
        let cmds = [
            UpstreamCommand::SessionUpdate { session: config() },
            UpstreamCommand::InputAudioBufferAppend { audio: "x".into() },
            UpstreamCommand::InputAudioBufferCommit,
        ];
        for cmd in cmds {
            let value: Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();
            assert_eq!(value["type"], cmd.kind());
        }
    }

    // ── events ──────────────────────────────────────────────────────

    #[test]
    fn decodes_lifecycle_events() {
        let cases = [
            ("session.created", ServerEvent::SessionCreated),
            ("session.updated", ServerEvent::SessionUpdated),
            ("response.create", ServerEvent::ResponseCreate),
            ("response.created", ServerEvent::ResponseCreated),
            ("response.done", ServerEvent::ResponseDone),
        ];
        for (kind, expected) in cases {
            let raw = json!({"type": kind, "event_id": "e1"}).to_string();
            let event = ServerEvent::decode(raw.as_bytes()).unwrap();
            assert_eq!(event, expected);
            assert_eq!(event.event_type(), kind);
        }
    }

    #[test]
    fn decodes_error_object() {
        let raw = json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "code": "bad_audio", "message": "nope"},
        });
        let event = ServerEvent::decode(raw.to_string().as_bytes()).unwrap();
        assert_matches!(
            &event,
            ServerEvent::Error { detail } if detail.code.as_deref() == Some("bad_audio")
        );
        assert!(event.ends_response());
        if let ServerEvent::Error { detail } = event {
            assert_eq!(detail.to_string(), "invalid_request_error/bad_audio: nope");
        }
    }

    #[test]
    fn decodes_error_nested_under_response() {
        let raw = br#"{"type":"error","response":{"error":"quota exceeded"}}"#;
        let event = ServerEvent::decode(raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::Error {
                detail: ErrorDetail {
                    message: Some("quota exceeded".into()),
                    ..ErrorDetail::default()
                }
            }
        );
    }

    #[test]
    fn error_without_payload_has_empty_detail() {
        let event = ServerEvent::decode(br#"{"type":"error"}"#).unwrap();
        assert_matches!(event, ServerEvent::Error { detail } if detail == ErrorDetail::default());
    }

    #[test]
    fn decodes_deltas() {
        let audio = ServerEvent::decode(br#"{"type":"response.audio.delta","delta":"AAAA"}"#)
            .unwrap();
        assert_eq!(
            audio,
            ServerEvent::AudioDelta {
                delta: "AAAA".into()
            }
        );
        let transcript =
            ServerEvent::decode(br#"{"type":"response.audio_transcript.delta","delta":"Hi"}"#)
                .unwrap();
        assert_eq!(
            transcript,
            ServerEvent::AudioTranscriptDelta { delta: "Hi".into() }
        );
        assert!(!transcript.ends_response());
    }

    #[test]
    fn unknown_event_is_passthrough_with_raw_bytes() {
        let raw = br#"{"type":"conversation.item.created","item":{"id":"x"}}"#;
        let event = ServerEvent::decode(raw).unwrap();
        assert_matches!(
            event,
            ServerEvent::Passthrough { ref event_type, raw: ref bytes }
                if event_type == "conversation.item.created" && bytes.as_ref() == raw.as_slice()
        );
    }

    #[test]
    fn non_object_is_decode_error() {
        assert_matches!(ServerEvent::decode(b"[1,2]"), Err(RelayError::Decode(_)));
        assert_matches!(ServerEvent::decode(b"\"hi\""), Err(RelayError::Decode(_)));
        assert_matches!(
            ServerEvent::decode(br#"{"type":7}"#),
            Err(RelayError::Decode(_))
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
                let _ = ServerEvent::decode(&bytes);
            }

            #[test]
            fn any_typed_object_decodes(kind in "[a-z_.]{1,32}") {
                let raw = json!({"type": &kind}).to_string();
                let event = ServerEvent::decode(raw.as_bytes()).unwrap();
                prop_assert_eq!(event.event_type(), kind.as_str());
            }
        }
    }
}
