//! Background footage selection.
//!
//! Captions are mapped to timed search terms, the terms are resolved to
//! stock-footage clips, and the resulting timeline is reconciled so every
//! moment of the narration has exactly one playable clip.

mod pexels;
mod reconcile;
mod search_terms;

pub use pexels::PexelsResolver;
pub use reconcile::{
    is_total_resolution_failure, reconcile_intervals, validate_coverage, validate_segments,
};
pub use search_terms::{
    fallback_search_terms, LlmSearchTermMapper, SearchTermInterval, SearchTermMapper,
};

use crate::error::Result;
use crate::timeline::TimeInterval;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A span of the timeline and the clip that plays during it.
///
/// `video_url` is `None` when resolution failed or was skipped for the span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundSegment {
    pub interval: TimeInterval,
    pub video_url: Option<String>,
}

impl BackgroundSegment {
    /// A segment with a resolved clip.
    pub fn resolved(interval: TimeInterval, video_url: impl Into<String>) -> Self {
        Self {
            interval,
            video_url: Some(video_url.into()),
        }
    }

    /// A segment whose clip could not be resolved.
    pub fn absent(interval: TimeInterval) -> Self {
        Self {
            interval,
            video_url: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.video_url.is_some()
    }
}

/// Trait for services that turn timed search terms into clip URLs.
#[async_trait]
pub trait ClipResolver: Send + Sync {
    /// Resolve each interval to at most one clip URL.
    ///
    /// Returns exactly one segment per input interval with the same bounds.
    async fn resolve(&self, terms: &[SearchTermInterval]) -> Result<Vec<BackgroundSegment>>;
}
