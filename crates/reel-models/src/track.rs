//! Audio tracks and playback policies.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;

/// How a track fills the timeline relative to the standard track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlaybackPolicy {
    /// Play once, cut to the standard length, silence afterwards
    #[default]
    SingleShot,
    /// Play `count` times back to back, capped at the standard length
    FixedLoop { count: NonZeroU32 },
    /// Loop until the longer of standard audio and video is covered
    AdaptiveLoop,
}

impl PlaybackPolicy {
    /// Fixed loop policy; `None` when `count` is zero.
    pub fn fixed_loop(count: u32) -> Option<Self> {
        NonZeroU32::new(count).map(|count| Self::FixedLoop { count })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackPolicy::SingleShot => "single_shot",
            PlaybackPolicy::FixedLoop { .. } => "fixed_loop",
            PlaybackPolicy::AdaptiveLoop => "adaptive_loop",
        }
    }
}

impl fmt::Display for PlaybackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackPolicy::FixedLoop { count } => write!(f, "fixed_loop({})", count),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// A probed audio source participating in reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioTrack {
    /// Audio file path
    pub source: PathBuf,
    /// Native duration in seconds
    pub duration_seconds: f64,
    /// Gain multiplier, must be positive
    #[serde(default = "default_volume")]
    pub volume_ratio: f64,
    /// Playback policy
    #[serde(default)]
    pub policy: PlaybackPolicy,
    /// Durational anchor for non-adaptive tracks
    #[serde(default)]
    pub is_standard: bool,
}

fn default_volume() -> f64 {
    1.0
}

impl AudioTrack {
    /// Create a single-shot track at unit gain.
    pub fn new(source: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            source: source.into(),
            duration_seconds,
            volume_ratio: default_volume(),
            policy: PlaybackPolicy::SingleShot,
            is_standard: false,
        }
    }

    pub fn with_volume(mut self, volume_ratio: f64) -> Self {
        self.volume_ratio = volume_ratio;
        self
    }

    pub fn with_policy(mut self, policy: PlaybackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Mark this track as the standard track.
    pub fn standard(mut self) -> Self {
        self.is_standard = true;
        self
    }
}

/// Synthesized speech file with its probed duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_loop_rejects_zero() {
        assert!(PlaybackPolicy::fixed_loop(0).is_none());
        assert_eq!(
            PlaybackPolicy::fixed_loop(2).unwrap().to_string(),
            "fixed_loop(2)"
        );
    }

    #[test]
    fn test_policy_serde_tagged() {
        let policy: PlaybackPolicy =
            serde_json::from_str(r#"{"mode":"fixed_loop","count":3}"#).unwrap();
        assert_eq!(policy, PlaybackPolicy::fixed_loop(3).unwrap());

        let adaptive: PlaybackPolicy = serde_json::from_str(r#"{"mode":"adaptive_loop"}"#).unwrap();
        assert_eq!(adaptive, PlaybackPolicy::AdaptiveLoop);
    }

    #[test]
    fn test_policy_serde_rejects_zero_count() {
        let parsed: Result<PlaybackPolicy, _> =
            serde_json::from_str(r#"{"mode":"fixed_loop","count":0}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_track_defaults_from_json() {
        let track: AudioTrack =
            serde_json::from_str(r#"{"source":"bgm.mp3","duration_seconds":8.0}"#).unwrap();
        assert_eq!(track.volume_ratio, 1.0);
        assert_eq!(track.policy, PlaybackPolicy::SingleShot);
        assert!(!track.is_standard);
    }
}
