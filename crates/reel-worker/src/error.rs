//! Pipeline error types.

use std::fmt;
use thiserror::Error;

use reel_catalog::CatalogError;
use reel_media::MediaError;
use reel_models::JobStage;
use reel_tts::TtsError;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Failure of the duration reconciliation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("No audio tracks to reconcile")]
    EmptyTrackSet,

    #[error("Invalid track {index}: {reason}")]
    InvalidTrack { index: usize, reason: String },

    #[error("Invalid video duration: {0}")]
    InvalidVideoDuration(f64),

    #[error("Reconciliation invariant violated: {0}")]
    InvariantViolation(String),
}

impl ReconcileError {
    pub fn invalid_track(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidTrack {
            index,
            reason: reason.into(),
        }
    }
}

/// Broad failure class reported on every pipeline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input from the caller, never retried
    Caller,
    /// Speech service, catalog, media engine, I/O or timeout
    Collaborator,
    /// Defect in the pipeline itself
    Internal,
    /// Cancellation requested by the caller
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Caller => "caller",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Internal => "internal",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cause of a failed stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Clip list is empty")]
    EmptyClipList,

    #[error("No clips matched and the default clip set is empty")]
    NoClipsAvailable,

    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[from] TtsError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("Job cancelled")]
    Cancelled,
}

impl StageError {
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::InvalidJob(_) | StageError::EmptyClipList | StageError::NoClipsAvailable => {
                ErrorKind::Caller
            }
            StageError::Reconcile(ReconcileError::InvariantViolation(_)) => ErrorKind::Internal,
            StageError::Reconcile(_) => ErrorKind::Caller,
            StageError::Media(MediaError::Cancelled) | StageError::Cancelled => ErrorKind::Cancelled,
            StageError::Synthesis(_)
            | StageError::Catalog(_)
            | StageError::Media(_)
            | StageError::Io(_)
            | StageError::Timeout { .. } => ErrorKind::Collaborator,
        }
    }

    /// Check if resubmitting the job could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StageError::Synthesis(e) => e.is_retryable(),
            StageError::Catalog(e) => e.is_retryable(),
            StageError::Media(e) => e.is_retryable(),
            StageError::Io(_) | StageError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// A job failure with the stage it happened in.
#[derive(Debug, Error)]
#[error("{stage} failed: {cause}")]
pub struct PipelineError {
    pub stage: JobStage,
    #[source]
    pub cause: StageError,
}

impl PipelineError {
    pub fn new(stage: JobStage, cause: impl Into<StageError>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            StageError::from(ReconcileError::invalid_track(1, "volume_ratio must be positive")).kind(),
            ErrorKind::Caller
        );
        assert_eq!(
            StageError::from(ReconcileError::InvariantViolation("final <= 0".into())).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            StageError::Timeout { operation: "synthesize", secs: 5 }.kind(),
            ErrorKind::Collaborator
        );
        assert_eq!(StageError::from(MediaError::Cancelled).kind(), ErrorKind::Cancelled);
        assert_eq!(StageError::NoClipsAvailable.kind(), ErrorKind::Caller);
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::new(JobStage::Synthesizing, StageError::Cancelled);
        assert_eq!(err.to_string(), "synthesizing failed: Job cancelled");
        assert!(err.is_cancelled());
    }
}
