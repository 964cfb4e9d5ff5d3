//! Pipeline configuration.

use std::time::Duration;

use reel_media::NormalizeTarget;
use reel_models::encoding::DEFAULT_FRAME_RATE;
use reel_models::{EncodingConfig, Resolution};
use reel_tts::DEFAULT_VOICE;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frame size every clip is normalized to
    pub resolution: Resolution,
    /// Frame rate every clip is normalized to
    pub frame_rate: f64,
    /// Encoder settings for normalized clips and the final mux
    pub encoding: EncodingConfig,
    /// Voice used when a job does not name one
    pub default_voice: String,
    /// Upper bound for each collaborator call
    pub collaborator_timeout: Duration,
    /// Keep the job work directory after a successful run
    pub keep_intermediates: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::FULL_HD,
            frame_rate: DEFAULT_FRAME_RATE,
            encoding: EncodingConfig::default(),
            default_voice: DEFAULT_VOICE.to_string(),
            collaborator_timeout: Duration::from_secs(600), // 10 minutes per encode
            keep_intermediates: false,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut encoding = defaults.encoding.clone();
        if let Some(crf) = env_parse("REEL_CRF") {
            encoding = encoding.with_crf(crf);
        }
        if let Ok(preset) = std::env::var("REEL_PRESET") {
            encoding.preset = preset;
        }
        if env_flag("REEL_USE_NVENC") {
            encoding = encoding.with_nvenc();
        }

        Self {
            resolution: Resolution::new(
                env_parse("REEL_WIDTH").unwrap_or(defaults.resolution.width),
                env_parse("REEL_HEIGHT").unwrap_or(defaults.resolution.height),
            ),
            frame_rate: env_parse("REEL_FPS")
                .filter(|fps: &f64| *fps > 0.0)
                .unwrap_or(defaults.frame_rate),
            encoding,
            default_voice: std::env::var("REEL_DEFAULT_VOICE").unwrap_or(defaults.default_voice),
            collaborator_timeout: env_parse("REEL_COLLABORATOR_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.collaborator_timeout),
            keep_intermediates: env_flag("REEL_KEEP_INTERMEDIATES"),
        }
    }

    pub fn normalize_target(&self) -> NormalizeTarget {
        NormalizeTarget {
            resolution: self.resolution,
            frame_rate: self.frame_rate,
        }
    }

    /// Collaborator timeout, honoring a per-job override in seconds.
    pub fn timeout_for(&self, job_override: Option<u64>) -> Duration {
        job_override
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.collaborator_timeout)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.resolution, Resolution::new(1920, 1080));
        assert_eq!(config.frame_rate, 30.0);
        assert_eq!(config.default_voice, "zh-CN-XiaoxiaoNeural");
        assert!(!config.keep_intermediates);
    }

    #[test]
    fn test_timeout_override() {
        let config = PipelineConfig::default();
        assert_eq!(config.timeout_for(None), Duration::from_secs(600));
        assert_eq!(config.timeout_for(Some(5)), Duration::from_secs(5));
        assert_eq!(config.timeout_for(Some(0)), Duration::from_secs(600));
    }
}
