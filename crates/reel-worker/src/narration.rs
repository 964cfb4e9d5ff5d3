//! Narration synthesis adapter.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use reel_media::MediaEngine;
use reel_models::AudioClip;
use reel_tts::SpeechSynthesizer;

use crate::error::StageError;
use crate::guard::CallGuard;

/// Produces the narration clip and measures it.
pub struct NarrationSynthesizer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    engine: Arc<dyn MediaEngine>,
}

impl NarrationSynthesizer {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            synthesizer,
            engine,
        }
    }

    /// Synthesize `text` into `work_dir` and probe its duration.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        work_dir: &Path,
        guard: &CallGuard,
    ) -> Result<AudioClip, StageError> {
        let path = work_dir.join(format!("narration.{}", self.synthesizer.output_extension()));

        guard
            .call(
                "synthesize",
                self.synthesizer.synthesize_to_file(text, voice, &path),
            )
            .await?;

        let probe = guard.call("probe", self.engine.probe(&path)).await?;
        info!(voice, duration = probe.duration, "Narration synthesized");

        Ok(AudioClip {
            path,
            duration_seconds: probe.duration,
        })
    }
}
