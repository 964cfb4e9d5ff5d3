//! Speech service request types.

use serde::{Deserialize, Serialize};

/// Encoded audio format returned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

/// Request body for `POST /v1/synthesize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to speak
    pub text: String,
    /// Voice identifier, e.g. `zh-CN-XiaoxiaoNeural`
    pub voice: String,
    /// Output encoding
    #[serde(default)]
    pub format: AudioFormat,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = SynthesisRequest {
            text: "你好".to_string(),
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            format: AudioFormat::Mp3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["format"], "mp3");
        assert_eq!(json["voice"], "zh-CN-XiaoxiaoNeural");
    }
}
