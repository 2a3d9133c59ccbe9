//! Conversation session parameters.

use serde::{Deserialize, Serialize};

/// Values sent to the service in `session.update`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Output modalities.
    pub modalities: Vec<String>,
    /// System instructions. Unset means the built-in interview template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Voice preset.
    pub voice: String,
    /// Format of audio the client sends.
    pub input_audio_format: String,
    /// Format of audio the service returns.
    pub output_audio_format: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Turn detection strategy.
    pub turn_detection: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            modalities: vec!["audio".to_string(), "text".to_string()],
            instructions: None,
            voice: "alloy".to_string(),
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            temperature: 0.8,
            turn_detection: "server_vad".to_string(),
        }
    }
}
