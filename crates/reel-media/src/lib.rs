//! FFmpeg CLI wrapper for the narrated video pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeout support via tokio
//! - The [`MediaEngine`] primitives (probe, normalize, trim, concat, mix, mux)

pub mod command;
pub mod engine;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ffprobe, wait_for_cancel, FfmpegCommand, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine, MixInput, NormalizeTarget};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{move_file, remove_path};
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
