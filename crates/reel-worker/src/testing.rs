//! In-process collaborators for unit tests.
//!
//! [`FakeEngine`] keeps a duration per path and writes a placeholder file for
//! every output so workspace cleanup can be observed on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use reel_catalog::{CatalogResult, ClipCatalog};
use reel_media::{MediaEngine, MediaError, MediaInfo, MediaResult, MixInput, NormalizeTarget};
use reel_models::ClipRef;
use reel_tts::{SpeechSynthesizer, TtsError, TtsResult};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Probe(PathBuf),
    Normalize { input: PathBuf, output: PathBuf, target: NormalizeTarget },
    Trim { input: PathBuf, length: f64 },
    Concat(Vec<PathBuf>),
    Mix(Vec<MixInput>),
    Mux { video: PathBuf, audio: PathBuf, duration: f64 },
}

#[derive(Default)]
pub struct FakeEngine {
    durations: Mutex<HashMap<PathBuf, f64>>,
    calls: Mutex<Vec<EngineCall>>,
    fail_on: Mutex<Option<&'static str>>,
    hang_on: Mutex<Option<&'static str>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `path` probe as `duration` seconds.
    pub fn register(&self, path: impl Into<PathBuf>, duration: f64) {
        self.durations.lock().unwrap().insert(path.into(), duration);
    }

    /// Fail every call of `operation` with an FFmpeg error.
    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    /// Never complete calls of `operation`.
    pub fn hang_on(&self, operation: &'static str) {
        *self.hang_on.lock().unwrap() = Some(operation);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn duration_of(&self, path: &Path) -> Option<f64> {
        self.durations.lock().unwrap().get(path).copied()
    }

    async fn enter(&self, operation: &'static str, call: EngineCall) -> MediaResult<()> {
        self.calls.lock().unwrap().push(call);
        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(MediaError::ffmpeg_failed(
                format!("{} failed", operation),
                None,
                Some(1),
            ));
        }
        let hang = *self.hang_on.lock().unwrap() == Some(operation);
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn lookup(&self, path: &Path) -> MediaResult<f64> {
        self.duration_of(path)
            .ok_or_else(|| MediaError::FileNotFound(path.to_path_buf()))
    }

    async fn produce(&self, output: &Path, duration: f64) -> MediaResult<()> {
        tokio::fs::write(output, format!("{duration}")).await?;
        self.register(output, duration);
        Ok(())
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        self.enter("probe", EngineCall::Probe(path.to_path_buf())).await?;
        let duration = self.lookup(path)?;
        Ok(MediaInfo {
            duration,
            width: 1280,
            height: 720,
            fps: 25.0,
            codec: "h264".to_string(),
            has_video: true,
            has_audio: true,
            size: 0,
        })
    }

    async fn normalize(&self, input: &Path, output: &Path, target: NormalizeTarget) -> MediaResult<()> {
        let call = EngineCall::Normalize {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            target,
        };
        self.enter("normalize", call).await?;
        let duration = self.lookup(input)?;
        self.produce(output, duration).await
    }

    async fn trim(&self, input: &Path, output: &Path, start: f64, length: f64) -> MediaResult<()> {
        let call = EngineCall::Trim {
            input: input.to_path_buf(),
            length,
        };
        self.enter("trim", call).await?;
        let duration = self.lookup(input)?;
        self.produce(output, length.min(duration - start)).await
    }

    async fn concat_video(&self, inputs: &[PathBuf], output: &Path) -> MediaResult<()> {
        self.enter("concat", EngineCall::Concat(inputs.to_vec())).await?;
        let mut total = 0.0;
        for input in inputs {
            total += self.lookup(input)?;
        }
        self.produce(output, total).await
    }

    async fn mix_audio_tracks(&self, inputs: &[MixInput], output: &Path) -> MediaResult<()> {
        self.enter("mix", EngineCall::Mix(inputs.to_vec())).await?;
        let longest = inputs.iter().map(|i| i.length).fold(0.0, f64::max);
        self.produce(output, longest).await
    }

    async fn mux_audio_video(
        &self,
        video: &Path,
        audio: &Path,
        duration: f64,
        output: &Path,
    ) -> MediaResult<()> {
        let call = EngineCall::Mux {
            video: video.to_path_buf(),
            audio: audio.to_path_buf(),
            duration,
        };
        self.enter("mux", call).await?;
        self.lookup(video)?;
        self.lookup(audio)?;
        self.produce(output, duration).await
    }
}

/// Synthesizer that writes a placeholder and registers its duration.
pub struct FakeSynthesizer {
    engine: Arc<FakeEngine>,
    duration: f64,
    fail: bool,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeSynthesizer {
    pub fn new(engine: Arc<FakeEngine>, duration: f64) -> Arc<Self> {
        Arc::new(Self {
            engine,
            duration,
            fail: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(engine: Arc<FakeEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            duration: 0.0,
            fail: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// `(text, voice)` pairs received so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize_to_file(&self, text: &str, voice: &str, output: &Path) -> TtsResult<()> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice.to_string()));
        if self.fail {
            return Err(TtsError::ServiceUnavailable("503".to_string()));
        }
        tokio::fs::write(output, b"speech").await?;
        self.engine.register(output, self.duration);
        Ok(())
    }
}

/// Catalog returning fixed match and default lists.
#[derive(Default)]
pub struct FakeCatalog {
    pub matches: Vec<ClipRef>,
    pub defaults: Vec<ClipRef>,
    keywords: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new(matches: Vec<ClipRef>, defaults: Vec<ClipRef>) -> Arc<Self> {
        Arc::new(Self {
            matches,
            defaults,
            keywords: Mutex::new(Vec::new()),
        })
    }

    pub fn keywords(&self) -> Vec<String> {
        self.keywords.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipCatalog for FakeCatalog {
    async fn select_clips(&self, keywords: &[String]) -> CatalogResult<Vec<ClipRef>> {
        *self.keywords.lock().unwrap() = keywords.to_vec();
        Ok(self.matches.clone())
    }

    async fn default_clips(&self) -> CatalogResult<Vec<ClipRef>> {
        Ok(self.defaults.clone())
    }
}
