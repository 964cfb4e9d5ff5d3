//! Source clip references and the assembled video timeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Full HD landscape, the default target for assembled timelines.
    pub const FULL_HD: Resolution = Resolution::new(1920, 1080);
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Reference to a source video segment in the media library.
///
/// Media attributes start out unknown and are filled once by
/// [`ClipRef::with_probe`]; a probed clip is never re-probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRef {
    /// Path of the source file
    pub path: PathBuf,

    /// Duration in seconds (known after probing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Native frame size (known after probing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// Native frame rate (known after probing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
}

impl ClipRef {
    /// Create an unprobed reference.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration_seconds: None,
            resolution: None,
            frame_rate: None,
        }
    }

    /// Whether media attributes have been populated.
    pub fn is_probed(&self) -> bool {
        self.duration_seconds.is_some()
    }

    /// Return a copy carrying probe results.
    ///
    /// Already-probed references are returned unchanged.
    pub fn with_probe(&self, duration_seconds: f64, resolution: Resolution, frame_rate: f64) -> Self {
        if self.is_probed() {
            return self.clone();
        }
        Self {
            path: self.path.clone(),
            duration_seconds: Some(duration_seconds),
            resolution: Some(resolution),
            frame_rate: Some(frame_rate),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used for log output.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Ordered, normalized clips concatenated into a single video artifact.
///
/// Lives only until the final mux.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// Normalized clips in playback order
    pub clips: Vec<ClipRef>,
    /// Concatenated video file
    pub artifact: PathBuf,
    /// Probe-accurate duration of the artifact
    pub duration_seconds: f64,
    /// Frame size shared by all clips
    pub resolution: Resolution,
    /// Frame rate shared by all clips
    pub frame_rate: f64,
}

impl Timeline {
    /// Sum of the normalized clip durations.
    ///
    /// May differ slightly from `duration_seconds` after frame-rate conversion.
    pub fn clip_duration_sum(&self) -> f64 {
        self.clips.iter().filter_map(|c| c.duration_seconds).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_probe_fills_once() {
        let clip = ClipRef::new("/library/city/street.mp4");
        assert!(!clip.is_probed());

        let probed = clip.with_probe(12.5, Resolution::new(1280, 720), 25.0);
        assert_eq!(probed.duration_seconds, Some(12.5));
        assert_eq!(probed.resolution, Some(Resolution::new(1280, 720)));

        let again = probed.with_probe(99.0, Resolution::FULL_HD, 60.0);
        assert_eq!(again, probed);
    }

    #[test]
    fn test_display_name() {
        let clip = ClipRef::new("/library/nature/lake.mp4");
        assert_eq!(clip.display_name(), "lake.mp4");
    }

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::FULL_HD.to_string(), "1920x1080");
    }

    #[test]
    fn test_unprobed_clip_serialization_omits_attributes() {
        let json = serde_json::to_string(&ClipRef::new("a.mp4")).unwrap();
        assert_eq!(json, r#"{"path":"a.mp4"}"#);
    }
}
