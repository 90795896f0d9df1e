//! OpenAI Whisper word-timestamp transcription.

use super::WordTranscriber;
use crate::captions::Word;
use crate::error::{ReelError, Result};
use crate::openai::create_client;
use async_openai::types::{
    AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity,
};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// OpenAI Whisper-based word transcriber.
pub struct WhisperWordTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl WhisperWordTranscriber {
    pub fn new() -> Self {
        Self::with_model("whisper-1")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }
}

impl Default for WhisperWordTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

/// Approximate word timings by spreading a segment's words evenly over it.
fn spread_words(text: &str, start: f64, end: f64) -> Vec<Word> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let end = end.max(start);
    let word_duration = (end - start) / words.len() as f64;

    words
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            let word_start = start + i as f64 * word_duration;
            let word_end = start + (i + 1) as f64 * word_duration;
            Word::new(word, word_start * 1000.0, word_end * 1000.0)
        })
        .collect()
}

/// Clamp timings so words never run backwards or overlap their successor's start.
fn monotonic(mut words: Vec<Word>) -> Vec<Word> {
    let mut last_start = 0.0_f64;
    for word in &mut words {
        word.start_ms = word.start_ms.max(0.0).max(last_start);
        word.end_ms = word.end_ms.max(word.start_ms);
        last_start = word.start_ms;
    }
    words
}

#[async_trait]
impl WordTranscriber for WhisperWordTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_words(&self, audio_path: &Path, language: Option<&str>) -> Result<Vec<Word>> {
        debug!("Transcribing audio file with word-level timestamps");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![TimestampGranularity::Word]);

        if let Some(lang) = language.filter(|l| !l.is_empty()) {
            request_builder.language(lang);
        }

        let request = request_builder.build().map_err(|e| {
            ReelError::Transcription(format!("Failed to build request: {}", e))
        })?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| ReelError::OpenAI(format!("Whisper API error: {}", e)))?;

        let words: Vec<Word> = match response.words {
            Some(ws) if !ws.is_empty() => ws
                .iter()
                .map(|w| Word::new(w.word.clone(), w.start as f64 * 1000.0, w.end as f64 * 1000.0))
                .collect(),
            _ => {
                warn!("No word-level timestamps returned, falling back to segment-level");
                match response.segments {
                    Some(segs) => segs
                        .iter()
                        .flat_map(|s| spread_words(&s.text, s.start as f64, s.end as f64))
                        .collect(),
                    None => spread_words(&response.text, 0.0, response.duration as f64),
                }
            }
        };

        debug!("Transcribed {} words", words.len());
        Ok(monotonic(words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_words_evenly() {
        let words = spread_words("breaking news today", 1.0, 2.5);
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].text, "breaking");
        assert!((words[0].start_ms - 1000.0).abs() < 1e-9);
        assert!((words[1].start_ms - 1500.0).abs() < 1e-9);
        assert!((words[2].end_ms - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_spread_words_blank_segment() {
        assert!(spread_words("   ", 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_monotonic_repairs_backwards_words() {
        let words = monotonic(vec![
            Word::new("a", 500.0, 900.0),
            Word::new("b", 400.0, 300.0),
            Word::new("c", -5.0, 1200.0),
        ]);

        assert_eq!(words[1].start_ms, 500.0);
        assert_eq!(words[1].end_ms, 500.0);
        assert_eq!(words[2].start_ms, 500.0);
        assert_eq!(words[2].end_ms, 1200.0);
    }
}
