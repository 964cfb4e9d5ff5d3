//! Structured job logging.
//!
//! Every line carries `job_id` so a single job can be followed through the
//! stage machine; stage transitions and the reconciled plan get their own
//! fields for filtering.

use tracing::{debug, error, info, Span};

use reel_models::{JobId, JobStage, ReconciliationResult};

/// Logger bound to one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_stage(&self, from: JobStage, to: JobStage) {
        info!(
            job_id = %self.job_id,
            from = %from,
            to = %to,
            "Job stage: {} -> {}", from, to
        );
    }

    /// Durations chosen by reconciliation, one line per job.
    pub fn log_plan(&self, plan: &ReconciliationResult) {
        debug!(
            job_id = %self.job_id,
            final_duration = plan.final_duration_seconds,
            mixed_duration = plan.mixed_duration_seconds,
            standard_index = plan.standard_index,
            trailing_silence = plan.trailing_silence(),
            tracks = plan.segments.len(),
            "Reconciled durations"
        );
    }

    pub fn log_failure(&self, stage: JobStage, kind: &str, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            stage = %stage,
            kind,
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, output: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            output,
            "Job completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping the whole job run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = self.operation
        )
    }
}
