//! Narrated video assembly pipeline.
//!
//! This crate provides:
//! - Duration reconciliation of audio tracks against the video timeline
//! - Timeline assembly (probe, normalize, concatenate)
//! - The job orchestrator and its stage state machine
//! - Structured job logging and Prometheus metrics

pub mod assembler;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod metrics;
pub mod narration;
pub mod orchestrator;
pub mod reconcile;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use assembler::TimelineAssembler;
pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError, ReconcileError, StageError};
pub use guard::CallGuard;
pub use logging::JobLogger;
pub use narration::NarrationSynthesizer;
pub use orchestrator::Orchestrator;
pub use reconcile::reconcile;
pub use workspace::JobWorkspace;
