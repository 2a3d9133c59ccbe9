//! Messages sent by the end-user socket.
//!
//! Client frames are JSON objects with a string `type` plus optional `audio`
//! (base64 PCM), `text`, and `response` (`modalities`, `instructions`).
//! Anything with an unrecognised `type` parses to
//! [`ClientRequest::Unsupported`] and is dropped by the translator.

use parley_core::Result;
use serde::Deserialize;

/// Client asks for captured audio to be appended to the input buffer.
pub const APPEND_AUDIO: &str = "input_audio_buffer.append";
/// Client asks for the input buffer to be committed.
pub const COMMIT_AUDIO: &str = "input_audio_buffer.commit";
/// Alternate commit name emitted by the desktop client when recording stops.
pub const AUDIO_INPUT_COMPLETE: &str = "audio.input.complete";
/// Client asks the model to produce a response.
pub const CREATE_RESPONSE: &str = "response.create";

#[derive(Debug, Deserialize)]
struct RawClientMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    response: Option<RawResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResponse {
    #[serde(default)]
    modalities: Vec<String>,
    #[serde(default)]
    instructions: Option<String>,
}

/// A decoded client message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientRequest {
    /// Append base64 audio to the upstream input buffer.
    AppendAudio {
        /// Base64-encoded audio, forwarded untouched.
        audio: String,
    },
    /// Commit the upstream input buffer.
    CommitAudio,
    /// Ask the upstream model for a response.
    CreateResponse {
        /// Instructions for this response, if the client supplied any.
        instructions: Option<String>,
        /// Modalities the client asked for. Informational only.
        modalities: Vec<String>,
    },
    /// A message type the relay does not translate.
    Unsupported {
        /// The `type` field as received.
        kind: String,
    },
}

impl ClientRequest {
    /// Decode a client frame.
    ///
    /// Fails only on malformed JSON or a missing `type`; unknown types are
    /// not an error.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: RawClientMessage = serde_json::from_slice(bytes)?;
        let request = match raw.kind.as_str() {
            APPEND_AUDIO => Self::AppendAudio {
                audio: raw.audio.unwrap_or_default(),
            },
            COMMIT_AUDIO | AUDIO_INPUT_COMPLETE => Self::CommitAudio,
            CREATE_RESPONSE => {
                let response = raw.response.unwrap_or_default();
                Self::CreateResponse {
                    instructions: response.instructions,
                    modalities: response.modalities,
                }
            }
            _ => Self::Unsupported { kind: raw.kind },
        };
        Ok(request)
    }

    /// The wire `type` this request was decoded from.
    pub fn kind(&self) -> &str {
        match self {
            Self::AppendAudio { .. } => APPEND_AUDIO,
            Self::CommitAudio => COMMIT_AUDIO,
            Self::CreateResponse { .. } => CREATE_RESPONSE,
            Self::Unsupported { kind } => kind,
        }
    }

    /// Whether this request starts a model response.
    pub fn starts_response(&self) -> bool {
        matches!(self, Self::CreateResponse { .. })
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

    #[test]
    fn parses_audio_append() {
        let req = ClientRequest::parse(br#"{"type":"input_audio_buffer.append","audio":"QUJD"}"#)
            .unwrap();
        assert_eq!(
            req,
            ClientRequest::AppendAudio {
                audio: "QUJD".into()
            }
        );
        assert_eq!(req.kind(), APPEND_AUDIO);
    }

    #[test]
    fn append_without_audio_is_empty() {
        let req = ClientRequest::parse(br#"{"type":"input_audio_buffer.append"}"#).unwrap();
        assert_matches!(req, ClientRequest::AppendAudio { audio } if audio.is_empty());
    }

    #[test]
    fn parses_response_create() {
        let req = ClientRequest::parse(
            br#"{"type":"response.create","response":{"modalities":["text"],"instructions":"go"}}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            ClientRequest::CreateResponse {
                instructions: Some("go".into()),
                modalities: vec!["text".into()],
            }
        );
        assert!(req.starts_response());
    }

    #[test]
    fn response_create_without_body() {
        let req = ClientRequest::parse(br#"{"type":"response.create"}"#).unwrap();
        assert_eq!(
            req,
            ClientRequest::CreateResponse {
                instructions: None,
                modalities: vec![],
            }
        );
    }

    #[test]
    fn both_commit_spellings() {
        for raw in [
            br#"{"type":"input_audio_buffer.commit"}"#.as_slice(),
            br#"{"type":"audio.input.complete"}"#.as_slice(),
        ] {
            assert_eq!(ClientRequest::parse(raw).unwrap(), ClientRequest::CommitAudio);
        }
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let req = ClientRequest::parse(br#"{"type":"conversation.item.create","text":"hi"}"#)
            .unwrap();
        assert_eq!(req.kind(), "conversation.item.create");
        assert_matches!(req, ClientRequest::Unsupported { .. });
        assert!(!req.starts_response());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        assert_matches!(ClientRequest::parse(b"{not json"), Err(RelayError::Decode(_)));
    }

    #[test]
    fn missing_type_is_decode_error() {
        assert_matches!(
            ClientRequest::parse(br#"{"audio":"QUJD"}"#),
            Err(RelayError::Decode(_))
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
                let _ = ClientRequest::parse(&bytes);
            }

            #[test]
            fn audio_survives_parse(audio in "[A-Za-z0-9+/=]{0,64}") {
                let raw = serde_json::json!({"type": APPEND_AUDIO, "audio": &audio}).to_string();
                let req = ClientRequest::parse(raw.as_bytes()).unwrap();
                prop_assert_eq!(req, ClientRequest::AppendAudio { audio });
            }
        }
    }
}
