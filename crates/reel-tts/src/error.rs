//! TTS client error types.

use thiserror::Error;

pub type TtsResult<T> = Result<T, TtsError>;

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("TTS service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty narration text")]
    EmptyText,

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TtsError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TtsError::ServiceUnavailable(_) | TtsError::Timeout(_) | TtsError::Network(_)
        )
    }
}
