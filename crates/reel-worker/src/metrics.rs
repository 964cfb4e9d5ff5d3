//! Prometheus metrics for the pipeline.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use reel_models::JobStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "reel_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "reel_jobs_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "reel_stage_duration_seconds";
    pub use reel_media::engine::FFMPEG_DURATION_SECONDS;
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Record job completion.
pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// Record job failure.
pub fn record_job_failed(stage: JobStage, kind: &str) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("kind", kind.to_string()),
    ];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record time spent in one stage.
pub fn record_stage_duration(stage: JobStage, duration_secs: f64) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}
