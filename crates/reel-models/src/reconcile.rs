//! Duration reconciliation request and result types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::track::AudioTrack;

/// Rule choosing which of (standard audio, video) sets the final length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrimMode {
    /// Shorter of the two
    #[default]
    Min,
    /// Longer of the two
    Max,
    /// Video length
    #[serde(alias = "video")]
    VideoLed,
    /// Standard audio length
    #[serde(alias = "audio")]
    AudioLed,
}

impl TrimMode {
    /// Select the final duration from the standard anchor and video length.
    pub fn select(&self, standard_seconds: f64, video_seconds: f64) -> f64 {
        match self {
            TrimMode::Min => standard_seconds.min(video_seconds),
            TrimMode::Max => standard_seconds.max(video_seconds),
            TrimMode::VideoLed => video_seconds,
            TrimMode::AudioLed => standard_seconds,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrimMode::Min => "min",
            TrimMode::Max => "max",
            TrimMode::VideoLed => "video_led",
            TrimMode::AudioLed => "audio_led",
        }
    }
}

impl fmt::Display for TrimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input to the reconciliation engine. Consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationRequest {
    pub video_duration_seconds: f64,
    pub tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub trim_mode: TrimMode,
}

impl ReconciliationRequest {
    pub fn new(video_duration_seconds: f64, tracks: Vec<AudioTrack>, trim_mode: TrimMode) -> Self {
        Self {
            video_duration_seconds,
            tracks,
            trim_mode,
        }
    }
}

/// The part of one track that goes into the mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Offset into the mix where the track starts
    pub start_offset: f64,
    /// Contribution length before final trimming
    pub length: f64,
    /// Repetitions played, counting a partial final one
    pub loops_applied: u32,
    /// Length of the last repetition (equals the source length when whole)
    pub tail_seconds: f64,
    /// Silence after a single-shot track shorter than the standard
    pub trailing_silence: f64,
}

impl TrackSegment {
    /// Length this track keeps after trimming to `final_seconds`.
    ///
    /// Trimming never extends a contribution.
    pub fn trimmed_length(&self, final_seconds: f64) -> f64 {
        self.length.min((final_seconds - self.start_offset).max(0.0))
    }
}

/// Output of the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Length of the final output
    pub final_duration_seconds: f64,
    /// Raw mixed length, the longest contribution
    pub mixed_duration_seconds: f64,
    /// Native duration of the standard track
    pub standard_duration_seconds: f64,
    /// Index of the standard track in the request
    pub standard_index: usize,
    /// One segment per track, in request order
    pub segments: Vec<TrackSegment>,
}

impl ReconciliationResult {
    /// Silence appended after the mix to reach the final duration.
    pub fn trailing_silence(&self) -> f64 {
        (self.final_duration_seconds - self.mixed_duration_seconds).max(0.0)
    }

    /// Whether the video timeline must be cut.
    pub fn trims_video(&self, video_duration_seconds: f64) -> bool {
        self.final_duration_seconds < video_duration_seconds
    }
}
