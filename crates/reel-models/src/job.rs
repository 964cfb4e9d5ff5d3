//! Pipeline job definitions and the per-job stage state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;
use validator::Validate;

use crate::reconcile::TrimMode;
use crate::track::PlaybackPolicy;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An extra audio track supplied by the caller (e.g. background music).
///
/// Its duration is probed when the job runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrackSpec {
    pub path: PathBuf,
    #[serde(default = "default_volume")]
    pub volume_ratio: f64,
    #[serde(default)]
    pub policy: PlaybackPolicy,
    /// Take over the standard role from the narration
    #[serde(default)]
    pub is_standard: bool,
}

fn default_volume() -> f64 {
    1.0
}

impl TrackSpec {
    pub fn new(path: impl Into<PathBuf>, volume_ratio: f64, policy: PlaybackPolicy) -> Self {
        Self {
            path: path.into(),
            volume_ratio,
            policy,
            is_standard: false,
        }
    }
}

/// Top-level unit of work: one narrated video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct PipelineJob {
    /// Unique job ID
    #[serde(default)]
    pub id: JobId,

    /// Script text, used for keyword extraction
    #[validate(length(min = 1, message = "script must not be empty"))]
    pub script: String,

    /// Narration text, sent to speech synthesis
    #[validate(length(min = 1, message = "narration must not be empty"))]
    pub narration: String,

    /// Voice identifier (falls back to the configured default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Directory receiving the final artifact
    pub output_dir: PathBuf,

    /// File name of the final artifact inside `output_dir`
    #[validate(length(min = 1, message = "final output name must not be empty"))]
    #[serde(default = "default_final_output")]
    pub final_output: String,

    /// Global trim rule
    #[serde(default)]
    pub trim_mode: TrimMode,

    /// Additional tracks mixed with the narration
    #[serde(default)]
    pub extra_tracks: Vec<TrackSpec>,

    /// Per-call collaborator timeout override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_final_output() -> String {
    "final_video.mp4".to_string()
}

impl PipelineJob {
    /// Create a job with default trim mode and no extra tracks.
    pub fn new(
        script: impl Into<String>,
        narration: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        final_output: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            script: script.into(),
            narration: narration.into(),
            voice: None,
            output_dir: output_dir.into(),
            final_output: final_output.into(),
            trim_mode: TrimMode::default(),
            extra_tracks: Vec::new(),
            timeout_secs: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_trim_mode(mut self, trim_mode: TrimMode) -> Self {
        self.trim_mode = trim_mode;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_track(mut self, track: TrackSpec) -> Self {
        self.extra_tracks.push(track);
        self
    }

    /// Whether `final_output` is a bare file name (no directory parts).
    pub fn has_plain_output_name(&self) -> bool {
        let name = self.final_output.as_str();
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\')
    }

    /// Final artifact path.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.final_output)
    }
}

/// Stage of a pipeline job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    #[default]
    Created,
    Synthesizing,
    ClipSelecting,
    Assembling,
    Reconciling,
    Muxing,
    Completed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::Synthesizing => "synthesizing",
            JobStage::ClipSelecting => "clip_selecting",
            JobStage::Assembling => "assembling",
            JobStage::Reconciling => "reconciling",
            JobStage::Muxing => "muxing",
            JobStage::Completed => "completed",
        }
    }

    /// The only stage reachable from this one on success.
    pub fn next(&self) -> Option<JobStage> {
        match self {
            JobStage::Created => Some(JobStage::Synthesizing),
            JobStage::Synthesizing => Some(JobStage::ClipSelecting),
            JobStage::ClipSelecting => Some(JobStage::Assembling),
            JobStage::Assembling => Some(JobStage::Reconciling),
            JobStage::Reconciling => Some(JobStage::Muxing),
            JobStage::Muxing => Some(JobStage::Completed),
            JobStage::Completed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Completed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// Running or completed at the given stage
    Active { stage: JobStage },
    /// Terminal failure attributed to a stage
    Failed { stage: JobStage, cause: String },
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Active {
            stage: JobStage::Created,
        }
    }
}

impl JobState {
    /// Current stage (the failing stage for `Failed`).
    pub fn stage(&self) -> JobStage {
        match self {
            JobState::Active { stage } | JobState::Failed { stage, .. } => *stage,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            JobState::Active { stage } => stage.is_terminal(),
            JobState::Failed { .. } => true,
        }
    }

    /// Whether `next` is the legal successor of the current state.
    pub fn can_advance_to(&self, next: JobStage) -> bool {
        match self {
            JobState::Active { stage } => stage.next() == Some(next),
            JobState::Failed { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut stage = JobStage::Created;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(
            visited,
            vec![
                JobStage::Created,
                JobStage::Synthesizing,
                JobStage::ClipSelecting,
                JobStage::Assembling,
                JobStage::Reconciling,
                JobStage::Muxing,
                JobStage::Completed,
            ]
        );
    }

    #[test]
    fn test_state_transitions() {
        let state = JobState::default();
        assert!(state.can_advance_to(JobStage::Synthesizing));
        assert!(!state.can_advance_to(JobStage::Muxing));

        let failed = JobState::Failed {
            stage: JobStage::Assembling,
            cause: "boom".to_string(),
        };
        assert!(failed.is_terminal());
        assert!(!failed.can_advance_to(JobStage::Reconciling));
        assert_eq!(failed.stage(), JobStage::Assembling);
    }

    #[test]
    fn test_job_validation() {
        let job = PipelineJob::new("", "narration", "/tmp/out", "final.mp4");
        assert!(job.validate().is_err());

        let job = PipelineJob::new("script", "narration", "/tmp/out", "final.mp4");
        assert!(job.validate().is_ok());
        assert!(job.has_plain_output_name());
        assert_eq!(job.output_path(), PathBuf::from("/tmp/out/final.mp4"));
    }

    #[test]
    fn test_output_name_rejects_paths() {
        let job = PipelineJob::new("s", "n", "/tmp/out", "../escape.mp4");
        assert!(!job.has_plain_output_name());
    }

    #[test]
    fn test_job_from_minimal_json() {
        let job: PipelineJob = serde_json::from_str(
            r#"{"script":"mountains","narration":"welcome","output_dir":"out"}"#,
        )
        .unwrap();
        assert_eq!(job.final_output, "final_video.mp4");
        assert_eq!(job.trim_mode, TrimMode::Min);
        assert!(job.extra_tracks.is_empty());
    }
}
