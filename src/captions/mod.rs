//! Timed captions derived from word-level speech timestamps.
//!
//! Words recognized in the narration are grouped into short caption windows
//! that the compositor burns into the video and that the search-term mapper
//! uses to pick background footage.

mod format;
mod windowing;

pub use format::{format_captions, CaptionExport, CaptionsExport, OutputFormat};
pub use windowing::{clean_word, generate_captions, CaptionConfig};

use crate::timeline::TimeInterval;
use serde::{Deserialize, Serialize};

/// A recognized word with its offsets in the audio track (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// The word as recognized.
    pub text: String,
    /// Start offset in milliseconds.
    pub start_ms: f64,
    /// End offset in milliseconds.
    pub end_ms: f64,
}

impl Word {
    /// Create a new word.
    pub fn new(text: impl Into<String>, start_ms: f64, end_ms: f64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
        }
    }
}

/// A caption window: display text attached to a span of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    /// When the caption is shown.
    pub interval: TimeInterval,
    /// Cleaned, space-joined words.
    pub text: String,
}

impl Caption {
    /// Create a new caption.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            interval: TimeInterval::new(start, end),
            text: text.into(),
        }
    }

    /// Duration of this caption in seconds.
    pub fn duration(&self) -> f64 {
        self.interval.duration()
    }
}

