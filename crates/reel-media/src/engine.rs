//! Media engine primitives.
//!
//! The pipeline composes these deterministic operations and never touches
//! pixels or samples itself. [`FfmpegEngine`] executes them with the FFmpeg
//! CLI; tests substitute in-process fakes.

use async_trait::async_trait;
use metrics::histogram;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

use reel_models::{EncodingConfig, Resolution};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{audio_mix_filter, concat_list_entry, normalize_filter};
use crate::probe::{probe_media, MediaInfo};

/// Histogram of FFmpeg wall time per operation.
pub const FFMPEG_DURATION_SECONDS: &str = "reel_ffmpeg_duration_seconds";

/// Frame format every timeline clip is converted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeTarget {
    pub resolution: Resolution,
    pub frame_rate: f64,
}

/// One audio input to [`MediaEngine::mix_audio_tracks`].
#[derive(Debug, Clone, PartialEq)]
pub struct MixInput {
    /// Source audio file
    pub path: PathBuf,
    /// Gain multiplier
    pub volume: f64,
    /// Seconds of (possibly looped) source to use
    pub length: f64,
    /// Repetitions of the source needed to cover `length`
    pub loops: u32,
}

/// Deterministic media operations consumed by the pipeline.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Read duration and stream attributes.
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    /// Scale/pad to `target.resolution`, then convert to `target.frame_rate`. Drops audio.
    async fn normalize(&self, input: &Path, output: &Path, target: NormalizeTarget) -> MediaResult<()>;

    /// Cut `length` seconds starting at `start`.
    async fn trim(&self, input: &Path, output: &Path, start: f64, length: f64) -> MediaResult<()>;

    /// Concatenate uniformly encoded clips in the given order.
    async fn concat_video(&self, inputs: &[PathBuf], output: &Path) -> MediaResult<()>;

    /// Overlay the inputs from offset 0; output lasts as long as the longest input.
    async fn mix_audio_tracks(&self, inputs: &[MixInput], output: &Path) -> MediaResult<()>;

    /// Combine video and audio into `output`, exactly `duration` seconds of audio
    /// (padded with silence if short) and at most `duration` seconds of video.
    async fn mux_audio_video(
        &self,
        video: &Path,
        audio: &Path,
        duration: f64,
        output: &Path,
    ) -> MediaResult<()>;
}

/// [`MediaEngine`] backed by the FFmpeg and FFprobe binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    encoding: EncodingConfig,
    timeout_secs: Option<u64>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl FfmpegEngine {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            timeout_secs: None,
            cancel_rx: None,
        }
    }

    /// Kill any single FFmpeg process running longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Kill the running FFmpeg process once `cancel_rx` flips to true.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    fn runner(&self) -> FfmpegRunner {
        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if let Some(rx) = &self.cancel_rx {
            runner = runner.with_cancel(rx.clone());
        }
        runner
    }

    async fn run_timed(&self, operation: &'static str, cmd: FfmpegCommand) -> MediaResult<()> {
        let started = Instant::now();
        let result = self
            .runner()
            .run_with_progress(&cmd, move |p| {
                debug!(operation, out_time_ms = p.out_time_ms, speed = p.speed, "FFmpeg progress");
            })
            .await;
        histogram!(FFMPEG_DURATION_SECONDS, "operation" => operation)
            .record(started.elapsed().as_secs_f64());
        result
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }

    async fn normalize(&self, input: &Path, output: &Path, target: NormalizeTarget) -> MediaResult<()> {
        if target.frame_rate <= 0.0 || target.resolution.width == 0 || target.resolution.height == 0 {
            return Err(MediaError::invalid_argument(format!(
                "invalid normalize target {} @ {} fps",
                target.resolution, target.frame_rate
            )));
        }

        let cmd = FfmpegCommand::new(input, output)
            .video_filter(normalize_filter(target.resolution, target.frame_rate))
            .output_args(self.encoding.video_args())
            .no_audio();

        self.run_timed("normalize", cmd).await
    }

    async fn trim(&self, input: &Path, output: &Path, start: f64, length: f64) -> MediaResult<()> {
        if start < 0.0 || length <= 0.0 {
            return Err(MediaError::invalid_argument(format!(
                "invalid trim window start={:.3} length={:.3}",
                start, length
            )));
        }

        let cmd = FfmpegCommand::new(input, output)
            .seek(start)
            .duration(length)
            .output_args(self.encoding.video_args())
            .output_args(self.encoding.audio_args());

        self.run_timed("trim", cmd).await
    }

    async fn concat_video(&self, inputs: &[PathBuf], output: &Path) -> MediaResult<()> {
        if inputs.is_empty() {
            return Err(MediaError::invalid_argument("concat requires at least one input"));
        }

        // Concat demuxer resolves relative entries against the list file
        let mut entries = Vec::with_capacity(inputs.len());
        for input in inputs {
            let absolute = tokio::fs::canonicalize(input)
                .await
                .map_err(|_| MediaError::FileNotFound(input.clone()))?;
            entries.push(concat_list_entry(&absolute.to_string_lossy()));
        }

        let list_path = output.with_extension("concat.txt");
        tokio::fs::write(&list_path, entries.join("\n") + "\n").await?;

        let cmd = FfmpegCommand::new(&list_path, output)
            .input_arg("-f")
            .input_arg("concat")
            .input_arg("-safe")
            .input_arg("0")
            .codec_copy();

        let result = self.run_timed("concat", cmd).await;
        let _ = tokio::fs::remove_file(&list_path).await;

        if result.is_ok() {
            info!("Concatenated {} clips into {}", inputs.len(), output.display());
        }
        result
    }

    async fn mix_audio_tracks(&self, inputs: &[MixInput], output: &Path) -> MediaResult<()> {
        let Some((first, rest)) = inputs.split_first() else {
            return Err(MediaError::invalid_argument("mix requires at least one track"));
        };
        if let Some(bad) = inputs.iter().find(|i| i.length <= 0.0 || i.volume <= 0.0 || i.loops == 0) {
            return Err(MediaError::invalid_argument(format!(
                "invalid mix input {}",
                bad.path.display()
            )));
        }

        let mut cmd = FfmpegCommand::new(&first.path, output)
            .stream_loop(first.loops - 1)
            .duration(first.length);
        for input in rest {
            cmd = cmd
                .input(&input.path)
                .stream_loop(input.loops - 1)
                .duration(input.length);
        }

        let volumes: Vec<f64> = inputs.iter().map(|i| i.volume).collect();
        let cmd = cmd
            .filter_complex(audio_mix_filter(&volumes))
            .map("[aout]")
            .audio_codec("pcm_s16le");

        self.run_timed("mix", cmd).await
    }

    async fn mux_audio_video(
        &self,
        video: &Path,
        audio: &Path,
        duration: f64,
        output: &Path,
    ) -> MediaResult<()> {
        if duration <= 0.0 {
            return Err(MediaError::invalid_argument(format!(
                "mux duration must be positive, got {:.3}",
                duration
            )));
        }

        let cmd = FfmpegCommand::new(video, output)
            .input(audio)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("copy")
            .audio_filter("apad")
            .output_args(self.encoding.audio_args())
            .output_duration(duration)
            .output_args(["-movflags", "+faststart"]);

        self.run_timed("mux", cmd).await
    }
}
