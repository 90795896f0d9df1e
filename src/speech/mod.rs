//! Text-to-speech synthesis of the narration.

use crate::error::{ReelError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Trait for text-to-speech services.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` with `voice` and write the audio to `output_path`.
    async fn synthesize(&self, text: &str, voice: &str, output_path: &Path) -> Result<()>;
}

/// OpenAI speech synthesizer writing MP3 files.
pub struct OpenAiSpeech {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: SpeechModel,
    default_voice: Voice,
}

/// Parse an OpenAI voice name such as "alloy" or "Nova".
pub fn parse_voice(name: &str) -> Option<Voice> {
    serde_json::from_value(serde_json::Value::String(name.trim().to_lowercase())).ok()
}

fn parse_model(name: &str) -> SpeechModel {
    match name {
        "tts-1" => SpeechModel::Tts1,
        "tts-1-hd" => SpeechModel::Tts1Hd,
        other => SpeechModel::Other(other.to_string()),
    }
}

impl OpenAiSpeech {
    pub fn new(model: &str, default_voice: &str) -> Self {
        let default_voice = parse_voice(default_voice).unwrap_or_else(|| {
            warn!("Unknown default voice '{}', using alloy", default_voice);
            Voice::Alloy
        });

        Self {
            client: create_client(),
            model: parse_model(model),
            default_voice,
        }
    }

    fn voice_for(&self, requested: &str) -> Voice {
        if requested.trim().is_empty() {
            return self.default_voice.clone();
        }
        parse_voice(requested).unwrap_or_else(|| {
            warn!("Unknown voice '{}', using the default voice", requested);
            self.default_voice.clone()
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str, voice: &str, output_path: &Path) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ReelError::Speech("Nothing to speak".to_string()));
        }

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.model.clone())
            .voice(self.voice_for(voice))
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| ReelError::Speech(format!("Failed to build request: {}", e)))?;

        debug!("Requesting speech synthesis");
        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| ReelError::OpenAI(format!("Speech API error: {}", e)))?;

        tokio::fs::write(output_path, &response.bytes).await?;
        info!("Wrote narration to {}", output_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice() {
        assert!(matches!(parse_voice("alloy"), Some(Voice::Alloy)));
        assert!(matches!(parse_voice(" Nova "), Some(Voice::Nova)));
        assert!(parse_voice("hi-IN-MadhurNeural").is_none());
    }

    #[test]
    fn test_parse_model() {
        assert!(matches!(parse_model("tts-1-hd"), SpeechModel::Tts1Hd));
        assert!(matches!(parse_model("gpt-4o-mini-tts"), SpeechModel::Other(_)));
    }
}
