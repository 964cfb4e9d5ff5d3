//! Timeline assembly.
//!
//! Clips are probed, normalized to one frame size and rate (scale and pad
//! first, then frame rate), and concatenated in the order given. Duplicates
//! are kept. The timeline duration is probed from the concatenated file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use reel_media::{MediaEngine, NormalizeTarget};
use reel_models::{ClipRef, Timeline};

use crate::error::StageError;
use crate::guard::CallGuard;

/// Builds one uniform video timeline from heterogeneous clips.
pub struct TimelineAssembler {
    engine: Arc<dyn MediaEngine>,
    target: NormalizeTarget,
}

impl TimelineAssembler {
    pub fn new(engine: Arc<dyn MediaEngine>, target: NormalizeTarget) -> Self {
        Self { engine, target }
    }

    pub fn target(&self) -> NormalizeTarget {
        self.target
    }

    /// Normalize and concatenate `clips` into `work_dir/timeline.mp4`.
    pub async fn assemble(
        &self,
        clips: &[ClipRef],
        work_dir: &Path,
        guard: &CallGuard,
    ) -> Result<Timeline, StageError> {
        if clips.is_empty() {
            return Err(StageError::EmptyClipList);
        }

        let clips_dir = work_dir.join("clips");
        tokio::fs::create_dir_all(&clips_dir).await?;

        let mut normalized = Vec::with_capacity(clips.len());
        for (index, clip) in clips.iter().enumerate() {
            guard.ensure_active()?;
            let source = self.probe_clip(clip, guard).await?;
            debug!(
                index,
                clip = %source.display_name(),
                duration = source.duration_seconds,
                "Normalizing clip"
            );

            let output = clips_dir.join(format!("{:03}.mp4", index));
            guard
                .call(
                    "normalize",
                    self.engine.normalize(source.path(), &output, self.target),
                )
                .await?;

            let info = guard.call("probe", self.engine.probe(&output)).await?;
            normalized.push(ClipRef::new(&output).with_probe(
                info.duration,
                self.target.resolution,
                self.target.frame_rate,
            ));
        }

        let artifact = work_dir.join("timeline.mp4");
        let inputs: Vec<PathBuf> = normalized.iter().map(|c| c.path().to_path_buf()).collect();
        guard
            .call("concat", self.engine.concat_video(&inputs, &artifact))
            .await?;

        let info = guard.call("probe", self.engine.probe(&artifact)).await?;

        let timeline = Timeline {
            clips: normalized,
            artifact,
            duration_seconds: info.duration,
            resolution: self.target.resolution,
            frame_rate: self.target.frame_rate,
        };

        info!(
            clips = timeline.clips.len(),
            duration = timeline.duration_seconds,
            clip_sum = timeline.clip_duration_sum(),
            "Assembled timeline {}",
            timeline.artifact.display()
        );

        Ok(timeline)
    }

    /// Fill in clip metadata unless it was probed already.
    async fn probe_clip(&self, clip: &ClipRef, guard: &CallGuard) -> Result<ClipRef, StageError> {
        if clip.is_probed() {
            return Ok(clip.clone());
        }
        let info = guard.call("probe", self.engine.probe(clip.path())).await?;
        Ok(clip.with_probe(info.duration, info.resolution(), info.fps))
    }
}
