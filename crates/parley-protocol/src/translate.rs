//! Client request to upstream command translation.
//!
//! Pure functions, no I/O. Audio payloads pass through byte-for-byte; the
//! translator never inspects or re-encodes them.

use crate::client::ClientRequest;
use crate::upstream::{ResponseOptions, SessionConfig, UpstreamCommand};

/// Modalities every relayed response is produced in.
pub const RESPONSE_MODALITIES: [&str; 2] = ["audio", "text"];

/// Map a client request onto the upstream command it stands for.
///
/// Returns `None` for request types the relay does not forward.
pub fn translate(request: &ClientRequest) -> Option<UpstreamCommand> {
    match request {
        ClientRequest::AppendAudio { audio } => Some(UpstreamCommand::InputAudioBufferAppend {
            audio: audio.clone(),
        }),
        ClientRequest::CommitAudio => Some(UpstreamCommand::InputAudioBufferCommit),
        ClientRequest::CreateResponse { instructions, .. } => {
            Some(UpstreamCommand::ResponseCreate {
                response: ResponseOptions {
                    modalities: RESPONSE_MODALITIES.iter().map(|m| (*m).to_owned()).collect(),
                    instructions: instructions.clone(),
                    commit: true,
                    cancel_previous: true,
                },
            })
        }
        ClientRequest::Unsupported { .. } => None,
    }
}

/// Build the `session.update` command for a session configuration.
pub fn session_update(config: SessionConfig) -> UpstreamCommand {
    UpstreamCommand::SessionUpdate { session: config }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::Value;

    fn wire(cmd: &UpstreamCommand) -> Value {
        serde_json::from_str(&cmd.to_json().unwrap()).unwrap()
    }

    #[test]
    fn append_keeps_audio_unchanged() {
        let req = ClientRequest::parse(br#"{"type":"input_audio_buffer.append","audio":"QUJD"}"#)
            .unwrap();
        let cmd = translate(&req).unwrap();
        let value = wire(&cmd);
        assert_eq!(value["type"], "input_audio_buffer.append");
        assert_eq!(value["audio"], "QUJD");
    }

    #[test]
    fn response_create_forces_modalities_and_commit() {
        let req = ClientRequest::parse(
            br#"{"type":"response.create","response":{"modalities":["text"],"instructions":"go"}}"#,
        )
        .unwrap();
        let cmd = translate(&req).unwrap();
        assert_matches!(&cmd, UpstreamCommand::ResponseCreate { response }
            if response.instructions.as_deref() == Some("go")
                && response.commit
                && response.cancel_previous
                && response.modalities == ["audio", "text"]);
        let value = wire(&cmd);
        assert_eq!(value["response"]["instructions"], "go");
        assert_eq!(value["response"]["commit"], true);
        assert_eq!(value["response"]["modalities"], serde_json::json!(["audio", "text"]));
    }

    #[test]
    fn commit_translates() {
        assert_eq!(
            translate(&ClientRequest::CommitAudio),
            Some(UpstreamCommand::InputAudioBufferCommit)
        );
    }

    #[test]
    fn unsupported_is_dropped() {
        let req = ClientRequest::Unsupported {
            kind: "conversation.item.create".into(),
        };
        assert_eq!(translate(&req), None);
    }

    #[test]
    fn session_update_wraps_config() {
        let cmd = session_update(SessionConfig::default());
        let value = wire(&cmd);
        assert_eq!(value["type"], "session.update");
        assert_eq!(value["session"]["voice"], "alloy");
        assert_eq!(value["session"]["output_audio_format"], "pcm16");
        assert!(
            value["session"]["instructions"]
                .as_str()
                .unwrap()
                .contains("mock interview")
        );
    }
}
