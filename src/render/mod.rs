//! Video composition: background footage, narration and burned-in captions.

mod ffmpeg;

pub use ffmpeg::{probe_duration, FfmpegCompositor, FfprobeProbe};

use crate::background::BackgroundSegment;
use crate::captions::Caption;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Everything needed to render one video.
#[derive(Debug, Clone)]
pub struct CompositionJob {
    /// Request id, used to keep working files of concurrent jobs apart.
    pub id: String,
    pub audio_path: PathBuf,
    /// Narration length in seconds; the output is trimmed to it.
    pub audio_duration: f64,
    pub captions: Vec<Caption>,
    /// Reconciled background timeline. Empty when no clip resolved.
    pub background: Vec<BackgroundSegment>,
    pub output_path: PathBuf,
}

/// Trait for video compositors.
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Render `job` and return the path of the finished video.
    async fn compose(&self, job: CompositionJob) -> Result<PathBuf>;
}

/// Trait for reading the length of a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Duration of `path` in seconds.
    async fn duration(&self, path: &Path) -> Result<f64>;
}
