//! Speech synthesis HTTP client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{TtsError, TtsResult};
use crate::types::{AudioFormat, HealthResponse, SynthesisRequest};

/// Voice used when neither the job nor the config names one.
pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";

/// Configuration for the TTS client.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Base URL of the speech service
    pub base_url: String,
    /// Bearer token, if the service requires one
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// Encoding requested from the service
    pub format: AudioFormat,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5002".to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
            max_retries: 2,
            format: AudioFormat::Mp3,
        }
    }
}

impl TtsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TTS_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5002".to_string()),
            api_key: std::env::var("TTS_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(
                std::env::var("TTS_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_retries: std::env::var("TTS_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            format: match std::env::var("TTS_FORMAT").as_deref() {
                Ok("wav") => AudioFormat::Wav,
                _ => AudioFormat::Mp3,
            },
        }
    }
}

/// Turns narration text into an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice` and write the encoded audio to `output`.
    async fn synthesize_to_file(&self, text: &str, voice: &str, output: &Path) -> TtsResult<()>;

    /// File extension of the audio this synthesizer writes.
    fn output_extension(&self) -> &'static str {
        "mp3"
    }
}

/// Client for the HTTP speech service.
pub struct TtsClient {
    http: Client,
    config: TtsConfig,
}

impl TtsClient {
    /// Create a new TTS client.
    pub fn new(config: TtsConfig) -> TtsResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TtsError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> TtsResult<Self> {
        Self::new(TtsConfig::from_env())
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    /// Check if the speech service is healthy.
    pub async fn health_check(&self) -> TtsResult<bool> {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("TTS service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("TTS service health check error: {}", e);
                Ok(false)
            }
        }
    }

    async fn synthesize_once(&self, request: &SynthesisRequest, output: &Path) -> TtsResult<u64> {
        let url = format!("{}/v1/synthesize", self.config.base_url);

        let mut builder = self.http.post(&url).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_network(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("TTS service returned {}: {}", status, body);
            return Err(
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    TtsError::ServiceUnavailable(message)
                } else {
                    TtsError::RequestFailed(message)
                },
            );
        }

        let mut file = tokio::fs::File::create(output).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_network(e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(TtsError::InvalidResponse("empty audio body".to_string()));
        }

        Ok(written)
    }

    fn map_network(&self, e: reqwest::Error) -> TtsError {
        if e.is_timeout() {
            TtsError::Timeout(self.config.timeout.as_secs())
        } else {
            TtsError::Network(e)
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> TtsResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = TtsResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "TTS request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(TtsError::RequestFailed("Unknown error".to_string())))
    }
}

#[async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize_to_file(&self, text: &str, voice: &str, output: &Path) -> TtsResult<()> {
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }

        let request = SynthesisRequest {
            text: text.to_string(),
            voice: voice.to_string(),
            format: self.config.format,
        };

        debug!(voice, chars = text.chars().count(), "Requesting speech synthesis");

        let result = self
            .with_retry(|| self.synthesize_once(&request, output))
            .await;

        match result {
            Ok(bytes) => {
                info!(voice, bytes, "Narration written to {}", output.display());
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(output).await;
                Err(e)
            }
        }
    }

    fn output_extension(&self) -> &'static str {
        self.config.format.extension()
    }
}
