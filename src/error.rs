//! Error types for Reelsmith.

use thiserror::Error;

/// Library-level error type for Reelsmith operations.
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Script generation failed: {0}")]
    Script(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Search term mapping failed: {0}")]
    SearchTerms(String),

    #[error("Clip resolution failed: {0}")]
    ClipResolution(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Metadata store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No background video could be resolved for any search term")]
    NoBackgroundVideo,

    #[error("Video generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for Reelsmith operations.
pub type Result<T> = std::result::Result<T, ReelError>;
