//! Pipeline orchestrator.
//!
//! Drives one job through `Created -> Synthesizing -> ClipSelecting ->
//! Assembling -> Reconciling -> Muxing -> Completed`. Any stage failure
//! moves the job to `Failed { stage, cause }`, removes every artifact it
//! created, and is returned as a [`PipelineError`]. There is no retry at
//! this level.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, Instrument};
use validator::Validate;

use reel_catalog::{ClipCatalog, KeywordExtractor};
use reel_media::{MediaEngine, MixInput};
use reel_models::{
    AudioClip, AudioTrack, ClipRef, JobStage, JobState, PipelineJob, ReconciliationRequest,
    Timeline,
};
use reel_tts::SpeechSynthesizer;

use crate::assembler::TimelineAssembler;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, ReconcileError, StageError};
use crate::guard::CallGuard;
use crate::logging::JobLogger;
use crate::metrics;
use crate::narration::NarrationSynthesizer;
use crate::reconcile::{reconcile, repetitions, validate_volume};
use crate::workspace::JobWorkspace;

/// Runs narrated video jobs against a fixed set of collaborators.
pub struct Orchestrator {
    config: PipelineConfig,
    engine: Arc<dyn MediaEngine>,
    narration: NarrationSynthesizer,
    catalog: Arc<dyn ClipCatalog>,
    assembler: TimelineAssembler,
    keywords: KeywordExtractor,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        engine: Arc<dyn MediaEngine>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        catalog: Arc<dyn ClipCatalog>,
    ) -> Self {
        Self {
            narration: NarrationSynthesizer::new(synthesizer, Arc::clone(&engine)),
            assembler: TimelineAssembler::new(Arc::clone(&engine), config.normalize_target()),
            keywords: KeywordExtractor::default(),
            config,
            engine,
            catalog,
        }
    }

    pub fn with_keyword_extractor(mut self, keywords: KeywordExtractor) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `job` to completion and return the absolute path of the final video.
    pub async fn run(
        &self,
        job: PipelineJob,
        cancel: watch::Receiver<bool>,
    ) -> Result<PathBuf, PipelineError> {
        let (state, _) = watch::channel(JobState::default());
        self.run_with_state(job, cancel, &state).await
    }

    /// Like [`Orchestrator::run`], publishing every state change to `state`.
    pub async fn run_with_state(
        &self,
        job: PipelineJob,
        cancel: watch::Receiver<bool>,
        state: &watch::Sender<JobState>,
    ) -> Result<PathBuf, PipelineError> {
        let logger = JobLogger::new(&job.id, "narrated_video");
        let span = logger.create_span();

        async {
            logger.log_start(&format!(
                "output={} trim_mode={} extra_tracks={}",
                job.output_path().display(),
                job.trim_mode,
                job.extra_tracks.len()
            ));

            let guard = CallGuard::new(self.config.timeout_for(job.timeout_secs), cancel);
            let mut tracker = StageTracker::new(&logger, state);

            if let Err(cause) = validate_job(&job) {
                return Err(fail(&logger, &mut tracker, None, cause).await);
            }

            let mut workspace = match JobWorkspace::create(&job).await {
                Ok(ws) => ws,
                Err(e) => return Err(fail(&logger, &mut tracker, None, e.into()).await),
            };

            match self.execute(&job, &guard, &mut workspace, &mut tracker).await {
                Ok(final_path) => {
                    tracker.advance(JobStage::Completed);
                    workspace.finish(self.config.keep_intermediates).await;
                    metrics::record_job_completed();
                    logger.log_completion(&final_path.display().to_string());
                    Ok(final_path)
                }
                Err(cause) => Err(fail(&logger, &mut tracker, Some(&workspace), cause).await),
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job: &PipelineJob,
        guard: &CallGuard,
        workspace: &mut JobWorkspace,
        tracker: &mut StageTracker<'_>,
    ) -> Result<PathBuf, StageError> {
        guard.ensure_active()?;
        tracker.advance(JobStage::Synthesizing);

        let voice = job.voice.as_deref().unwrap_or(&self.config.default_voice);
        let (narration, clips) = tokio::join!(
            self.narration
                .synthesize(&job.narration, voice, workspace.work_dir(), guard),
            self.select_clips(&job.script, guard),
        );
        let narration = narration?;

        tracker.advance(JobStage::ClipSelecting);
        let clips = clips?;

        guard.ensure_active()?;
        tracker.advance(JobStage::Assembling);
        let timeline = self
            .assembler
            .assemble(&clips, workspace.work_dir(), guard)
            .await?;

        guard.ensure_active()?;
        tracker.advance(JobStage::Reconciling);
        let request = self.build_request(job, &narration, &timeline, guard).await?;
        let plan = reconcile(&request)?;
        tracker.logger.log_plan(&plan);

        guard.ensure_active()?;
        tracker.advance(JobStage::Muxing);
        let final_duration = plan.final_duration_seconds;

        let mix_inputs = request
            .tracks
            .iter()
            .zip(&plan.segments)
            .map(|(track, segment)| {
                let length = segment.trimmed_length(final_duration);
                Ok(MixInput {
                    path: track.source.clone(),
                    volume: track.volume_ratio,
                    length,
                    loops: repetitions(length, track.duration_seconds)?,
                })
            })
            .collect::<Result<Vec<MixInput>, ReconcileError>>()?;

        let mixed = workspace.path("mix.wav");
        guard
            .call("mix", self.engine.mix_audio_tracks(&mix_inputs, &mixed))
            .await?;

        let video = if plan.trims_video(timeline.duration_seconds) {
            let trimmed = workspace.path("timeline_trimmed.mp4");
            guard
                .call(
                    "trim",
                    self.engine
                        .trim(&timeline.artifact, &trimmed, 0.0, final_duration),
                )
                .await?;
            trimmed
        } else {
            timeline.artifact.clone()
        };

        let muxed = workspace.path(&format!("muxed-{}", job.final_output));
        guard
            .call(
                "mux",
                self.engine
                    .mux_audio_video(&video, &mixed, final_duration, &muxed),
            )
            .await?;

        // Output produced after cancellation is discarded
        guard.ensure_active()?;

        Ok(workspace.commit(&muxed).await?)
    }

    /// Keywords from the script, catalog matches, default clips as fallback.
    async fn select_clips(&self, script: &str, guard: &CallGuard) -> Result<Vec<ClipRef>, StageError> {
        let keywords = self.keywords.extract(script);
        debug!(keywords = ?keywords, "Extracted keywords");

        let clips = guard
            .call("select_clips", self.catalog.select_clips(&keywords))
            .await?;
        if !clips.is_empty() {
            return Ok(clips);
        }

        debug!("No clip matched the script, using default clips");
        let defaults = guard
            .call("default_clips", self.catalog.default_clips())
            .await?;
        if defaults.is_empty() {
            return Err(StageError::NoClipsAvailable);
        }
        Ok(defaults)
    }

    /// Narration first, then the job's extra tracks with probed durations.
    async fn build_request(
        &self,
        job: &PipelineJob,
        narration: &AudioClip,
        timeline: &Timeline,
        guard: &CallGuard,
    ) -> Result<ReconciliationRequest, StageError> {
        let extra_claims_standard = job.extra_tracks.iter().any(|t| t.is_standard);

        let mut narration_track = AudioTrack::new(&narration.path, narration.duration_seconds);
        if !extra_claims_standard {
            narration_track = narration_track.standard();
        }

        let mut tracks = Vec::with_capacity(1 + job.extra_tracks.len());
        tracks.push(narration_track);

        for spec in &job.extra_tracks {
            let info = guard.call("probe", self.engine.probe(&spec.path)).await?;
            tracks.push(AudioTrack {
                source: spec.path.clone(),
                duration_seconds: info.duration,
                volume_ratio: spec.volume_ratio,
                policy: spec.policy,
                is_standard: spec.is_standard,
            });
        }

        Ok(ReconciliationRequest::new(
            timeline.duration_seconds,
            tracks,
            job.trim_mode,
        ))
    }
}

/// Reject a job before any collaborator is called.
fn validate_job(job: &PipelineJob) -> Result<(), StageError> {
    job.validate()
        .map_err(|e| StageError::invalid_job(e.to_string()))?;

    let id = job.id.as_str();
    if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
        return Err(StageError::invalid_job(format!("invalid job id {:?}", id)));
    }

    if !job.has_plain_output_name() {
        return Err(StageError::invalid_job(format!(
            "final output must be a plain file name, got {:?}",
            job.final_output
        )));
    }

    // Narration is track 0
    let mut standard_claimed = false;
    for (i, spec) in job.extra_tracks.iter().enumerate() {
        validate_volume(i + 1, spec.volume_ratio)?;
        if spec.is_standard {
            if standard_claimed {
                return Err(ReconcileError::invalid_track(
                    i + 1,
                    "more than one track is marked standard",
                )
                .into());
            }
            standard_claimed = true;
        }
    }

    Ok(())
}

async fn fail(
    logger: &JobLogger,
    tracker: &mut StageTracker<'_>,
    workspace: Option<&JobWorkspace>,
    cause: StageError,
) -> PipelineError {
    let stage = tracker.fail(&cause);
    if let Some(workspace) = workspace {
        workspace.discard().await;
    }

    let kind = cause.kind();
    metrics::record_job_failed(stage, kind.as_str());
    logger.log_failure(stage, kind.as_str(), &cause.to_string());

    PipelineError { stage, cause }
}

/// Current job state plus per-stage timing.
struct StageTracker<'a> {
    logger: &'a JobLogger,
    state: &'a watch::Sender<JobState>,
    entered: Instant,
}

impl<'a> StageTracker<'a> {
    fn new(logger: &'a JobLogger, state: &'a watch::Sender<JobState>) -> Self {
        state.send_replace(JobState::default());
        Self {
            logger,
            state,
            entered: Instant::now(),
        }
    }

    fn stage(&self) -> JobStage {
        self.state.borrow().stage()
    }

    fn advance(&mut self, next: JobStage) {
        let from = self.stage();
        debug_assert!(self.state.borrow().can_advance_to(next));

        metrics::record_stage_duration(from, self.entered.elapsed().as_secs_f64());
        self.logger.log_stage(from, next);
        self.state.send_replace(JobState::Active { stage: next });
        self.entered = Instant::now();
    }

    fn fail(&mut self, cause: &StageError) -> JobStage {
        let stage = self.stage();
        metrics::record_stage_duration(stage, self.entered.elapsed().as_secs_f64());
        self.state.send_replace(JobState::Failed {
            stage,
            cause: cause.to_string(),
        });
        stage
    }
}
