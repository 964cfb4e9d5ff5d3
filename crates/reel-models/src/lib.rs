//! Shared data models for the narrated video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source clips and the assembled timeline
//! - Audio tracks and their playback policies
//! - Duration reconciliation requests and results
//! - Pipeline jobs and their stage state machine
//! - Encoding configuration

pub mod clip;
pub mod encoding;
pub mod job;
pub mod reconcile;
pub mod track;

// Re-export common types
pub use clip::{ClipRef, Resolution, Timeline};
pub use encoding::EncodingConfig;
pub use job::{JobId, JobStage, JobState, PipelineJob, TrackSpec};
pub use reconcile::{ReconciliationRequest, ReconciliationResult, TrackSegment, TrimMode};
pub use track::{AudioClip, AudioTrack, PlaybackPolicy};
