//! Client for the speech synthesis service.
//!
//! Narration text goes in, an audio file comes out. Duration probing is
//! left to the caller's media engine.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SpeechSynthesizer, TtsClient, TtsConfig, DEFAULT_VOICE};
pub use error::{TtsError, TtsResult};
pub use types::{AudioFormat, SynthesisRequest};
