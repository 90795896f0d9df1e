//! Word-level transcription of synthesized narration.
//!
//! Captions are built from per-word timings, so transcribers return words
//! with millisecond bounds rather than sentence segments.

mod whisper;

pub use whisper::WhisperWordTranscriber;

use crate::captions::Word;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for services that time each spoken word of an audio file.
#[async_trait]
pub trait WordTranscriber: Send + Sync {
    /// Transcribe `audio_path` into words ordered by start time.
    async fn transcribe_words(&self, audio_path: &Path, language: Option<&str>) -> Result<Vec<Word>>;
}
