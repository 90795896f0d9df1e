//! Persistent metadata for generated videos.

mod sqlite;

pub use sqlite::SqliteMetadataStore;

use crate::config::ContentType;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored record describing one generated video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Where the rendered file lives.
    pub video_path: String,
    /// Topic the video was generated from.
    pub topic: String,
    pub content_type: ContentType,
    pub language: String,
    /// Narration script, when known.
    pub script: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when recording a new video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVideoMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub video_path: String,
    pub topic: String,
    #[serde(default)]
    pub content_type: ContentType,
    pub language: String,
    #[serde(default)]
    pub script: Option<String>,
}

impl NewVideoMetadata {
    /// Default metadata for a freshly generated video.
    pub fn generated(
        topic: &str,
        video_path: &str,
        content_type: ContentType,
        language: &str,
        tags: Vec<String>,
    ) -> Self {
        Self {
            title: format!("{} ({})", topic.trim(), Utc::now().format("%Y-%m-%d %H:%M")),
            description: "Auto-generated video from text".to_string(),
            tags,
            video_path: video_path.to_string(),
            topic: topic.trim().to_string(),
            content_type,
            language: language.to_string(),
            script: None,
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }
}

/// Trait for metadata store implementations.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store a new record and return it with its id and timestamp.
    async fn insert(&self, metadata: &NewVideoMetadata) -> Result<VideoMetadata>;

    async fn get(&self, id: i64) -> Result<Option<VideoMetadata>>;

    /// Records, newest first.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<VideoMetadata>>;

    /// Delete a record. Returns false when it did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;
}
