//! Configuration settings for Reelsmith.

use super::ContentType;
use crate::captions::CaptionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub script: ScriptSettings,
    pub speech: SpeechSettings,
    pub transcription: TranscriptionSettings,
    pub captions: CaptionConfig,
    pub search_terms: SearchTermSettings,
    pub footage: FootageSettings,
    pub render: RenderSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for per-request working files.
    pub temp_dir: String,
    /// Directory where finished videos are written (served under /static).
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Upper bound on a whole generation request.
    pub request_timeout_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.reelsmith".to_string(),
            temp_dir: "/tmp/reelsmith".to_string(),
            output_dir: "~/.reelsmith/videos".to_string(),
            log_level: "info".to_string(),
            request_timeout_secs: 600,
        }
    }
}

/// Script generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Chat model used to write the narration.
    pub model: String,
    /// OpenAI-compatible endpoint (e.g. https://api.groq.com/openai/v1).
    pub api_base: Option<String>,
    /// API key for `api_base`. Falls back to OPENAI_API_KEY.
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Narration language when a request does not specify one.
    pub default_language: String,
    /// Content type when a request does not specify one.
    pub default_content_type: ContentType,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            temperature: 0.0,
            default_language: "Hindi".to_string(),
            default_content_type: ContentType::News,
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Speech model (tts-1, tts-1-hd).
    pub model: String,
    /// Voice used when a request does not specify one.
    pub default_voice: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            default_voice: "alloy".to_string(),
        }
    }
}

/// Word-timestamp transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional ISO-639-1 language hint.
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

/// Search-term mapping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTermSettings {
    /// Chat model used to pick footage search terms.
    pub model: String,
    /// Maximum search terms kept per interval.
    pub max_terms: usize,
}

impl Default for SearchTermSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_terms: 3,
        }
    }
}

/// Requested footage orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
    Square,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
            Orientation::Square => write!(f, "square"),
        }
    }
}

/// Stock footage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FootageSettings {
    /// Footage provider (pexels).
    pub provider: String,
    /// Pexels API key. Falls back to PEXELS_API_KEY.
    pub api_key: Option<String>,
    pub orientation: Orientation,
    /// Results requested per search.
    pub per_page: u32,
    /// Maximum concurrent clip downloads.
    pub max_concurrent_downloads: usize,
    /// Abort instead of repairing when search-term intervals do not tile the audio.
    pub strict_intervals: bool,
    /// Slack allowed when checking interval coverage, in seconds.
    pub interval_tolerance_seconds: f64,
}

impl Default for FootageSettings {
    fn default() -> Self {
        Self {
            provider: "pexels".to_string(),
            api_key: None,
            orientation: Orientation::Portrait,
            per_page: 15,
            max_concurrent_downloads: 3,
            strict_intervals: false,
            interval_tolerance_seconds: 0.25,
        }
    }
}

/// What to render when no background clip resolved at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissingBackground {
    /// Captions over a solid background.
    #[default]
    Blank,
    /// Fail the request.
    Abort,
}

impl std::str::FromStr for MissingBackground {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blank" => Ok(MissingBackground::Blank),
            "abort" => Ok(MissingBackground::Abort),
            _ => Err(format!("Unknown missing background policy: {}", s)),
        }
    }
}

/// Rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate: String,
    /// x264 preset.
    pub preset: String,
    /// Caption font family.
    pub font: String,
    /// Caption font size (libass script units).
    pub font_size: u32,
    /// Caption outline width.
    pub outline: u32,
    /// Caption distance from the bottom edge (libass script units).
    pub margin_v: u32,
    /// Solid colour used when there is no background clip.
    pub background_color: String,
    pub missing_background: MissingBackground,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 24,
            video_bitrate: "4000k".to_string(),
            preset: "faster".to_string(),
            font: "Arial".to_string(),
            font_size: 18,
            outline: 2,
            margin_v: 60,
            background_color: "black".to_string(),
            missing_background: MissingBackground::Blank,
        }
    }
}

/// Metadata database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database.
    pub sqlite_path: String,
    /// Tags attached to every stored video.
    pub default_tags: Vec<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.reelsmith/videos.db".to_string(),
            default_tags: vec!["text-to-video".to_string(), "shorts".to_string()],
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Origin allowed by CORS. None allows any origin.
    pub allowed_origin: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            allowed_origin: Some("http://localhost:3000".to_string()),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReelError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelsmith")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.database.sqlite_path)
    }

    /// Pexels API key from the config file or PEXELS_API_KEY.
    pub fn pexels_api_key(&self) -> Option<String> {
        non_empty(self.footage.api_key.as_ref()).or_else(|| env_var("PEXELS_API_KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.captions.max_caption_size, 15);
        assert_eq!(settings.captions.min_duration, 2.0);
        assert_eq!(settings.render.width, 1080);
        assert_eq!(settings.render.height, 1920);
        assert_eq!(settings.footage.orientation, Orientation::Portrait);
        assert_eq!(settings.script.default_content_type, ContentType::News);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [captions]
            max_caption_size = 24

            [render]
            missing_background = "abort"

            [script]
            default_content_type = "interesting-facts"
            "#,
        )
        .unwrap();

        assert_eq!(settings.captions.max_caption_size, 24);
        assert_eq!(settings.captions.min_duration, 2.0);
        assert_eq!(settings.render.missing_background, MissingBackground::Abort);
        assert_eq!(settings.render.fps, 24);
        assert_eq!(settings.script.default_content_type, ContentType::InterestingFacts);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.speech.default_voice = "nova".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.speech.default_voice, "nova");
    }
}
