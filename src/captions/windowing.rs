//! Caption windowing.
//!
//! Groups consecutive words into captions. A window closes as soon as its
//! text reaches `max_caption_size` characters or its duration reaches
//! `min_duration` seconds, whichever comes first.

use super::{Caption, Word};
use crate::error::{ReelError, Result};
use crate::timeline::TimeInterval;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Thresholds for closing a caption window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Character length at which a window closes.
    pub max_caption_size: usize,
    /// Duration in seconds at which a window closes.
    pub min_duration: f64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            max_caption_size: 15,
            min_duration: 2.0,
        }
    }
}

fn unwanted_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[^\w\s\-_"']"#).expect("caption cleaning pattern is valid"))
}

/// Strip everything except word characters, whitespace, hyphens,
/// underscores and quote marks.
pub fn clean_word(word: &str) -> String {
    unwanted_chars().replace_all(word, "").into_owned()
}

/// Words accumulated for the window under construction.
#[derive(Default)]
struct Window {
    start: Option<f64>,
    end: f64,
    words: Vec<String>,
    open: bool,
}

impl Window {
    fn push(&mut self, word: &Word) {
        let span = TimeInterval::from_millis(word.start_ms, word.end_ms);
        if self.start.is_none() {
            self.start = Some(span.start);
        }
        let cleaned = clean_word(&word.text);
        if !cleaned.is_empty() {
            self.words.push(cleaned);
        }
        self.end = span.end;
        self.open = true;
    }

    fn text(&self) -> String {
        self.words.join(" ")
    }

    fn should_close(&self, config: &CaptionConfig) -> bool {
        let start = self.start.unwrap_or(self.end);
        self.text().chars().count() >= config.max_caption_size
            || self.end - start >= config.min_duration
    }

    fn close(&mut self) -> Caption {
        let caption = Caption::new(self.start.unwrap_or(self.end), self.end, self.text());
        *self = Window::default();
        caption
    }
}

fn validate_words(words: &[Word]) -> Result<()> {
    let mut previous_start: Option<f64> = None;

    for (idx, word) in words.iter().enumerate() {
        if !word.start_ms.is_finite() || !word.end_ms.is_finite() {
            return Err(ReelError::InvalidInput(format!(
                "word {} ({:?}) has a non-finite timestamp",
                idx, word.text
            )));
        }
        if word.start_ms < 0.0 || word.end_ms < 0.0 {
            return Err(ReelError::InvalidInput(format!(
                "word {} ({:?}) has a negative timestamp",
                idx, word.text
            )));
        }
        if word.end_ms < word.start_ms {
            return Err(ReelError::InvalidInput(format!(
                "word {} ({:?}) ends at {}ms before it starts at {}ms",
                idx, word.text, word.end_ms, word.start_ms
            )));
        }
        if let Some(prev) = previous_start {
            if word.start_ms < prev {
                return Err(ReelError::InvalidInput(format!(
                    "word {} ({:?}) starts at {}ms, before the previous word at {}ms",
                    idx, word.text, word.start_ms, prev
                )));
            }
        }
        previous_start = Some(word.start_ms);
    }

    Ok(())
}

/// Group an ordered word sequence into caption windows.
///
/// Fails with [`ReelError::InvalidInput`] on non-finite, negative, inverted or
/// out-of-order timestamps. An empty word list yields no captions.
///
/// Words that clean to an empty string (bare punctuation) extend the window's
/// timing but add no text, so they never count toward `max_caption_size`.
pub fn generate_captions(words: &[Word], config: &CaptionConfig) -> Result<Vec<Caption>> {
    validate_words(words)?;

    let mut captions = Vec::new();
    let mut window = Window::default();

    for word in words {
        window.push(word);
        if window.should_close(config) {
            captions.push(window.close());
        }
    }

    if window.open {
        captions.push(window.close());
    }

    debug!("Grouped {} words into {} captions", words.len(), captions.len());
    Ok(captions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(raw: &[(&str, f64, f64)]) -> Vec<Word> {
        raw.iter().map(|(t, s, e)| Word::new(*t, *s, *e)).collect()
    }

    #[test]
    fn test_empty_input() {
        let captions = generate_captions(&[], &CaptionConfig::default()).unwrap();
        assert!(captions.is_empty());
    }

    #[test]
    fn test_breaking_news_closes_on_length() {
        let input = words(&[
            ("Breaking", 0.0, 500.0),
            ("news", 500.0, 1200.0),
            ("today", 1200.0, 2600.0),
        ]);

        let captions = generate_captions(&input, &CaptionConfig::default()).unwrap();

        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "Breaking news today");
        assert_eq!(captions[0].interval.start, 0.0);
        assert_eq!(captions[0].interval.end, 2.6);
    }

    #[test]
    fn test_group_starting_at_zero_keeps_its_start() {
        let input = words(&[("a", 0.0, 300.0), ("b", 300.0, 600.0), ("c", 600.0, 2100.0)]);

        let captions = generate_captions(&input, &CaptionConfig::default()).unwrap();

        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].interval.start, 0.0);
        assert_eq!(captions[0].interval.end, 2.1);
        assert_eq!(captions[0].text, "a b c");
    }

    #[test]
    fn test_closes_on_duration() {
        let input = words(&[
            ("Hi", 1000.0, 1500.0),
            ("there", 1500.0, 3000.0),
            ("friend", 3000.0, 3400.0),
        ]);

        let captions = generate_captions(&input, &CaptionConfig::default()).unwrap();

        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0], Caption::new(1.0, 3.0, "Hi there"));
        assert_eq!(captions[1], Caption::new(3.0, 3.4, "friend"));
    }

    #[test]
    fn test_single_long_word_is_own_caption() {
        let input = words(&[
            ("Supercalifragilistic", 0.0, 400.0),
            ("yes", 400.0, 600.0),
        ]);

        let captions = generate_captions(&input, &CaptionConfig::default()).unwrap();

        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].text, "Supercalifragilistic");
        assert_eq!(captions[1].text, "yes");
    }

    #[test]
    fn test_punctuation_only_word_keeps_timing() {
        let input = words(&[("Wow", 0.0, 400.0), ("!!", 400.0, 2500.0)]);

        let captions = generate_captions(&input, &CaptionConfig::default()).unwrap();

        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "Wow");
        assert_eq!(captions[0].interval.end, 2.5);
    }

    #[test]
    fn test_clean_word() {
        assert_eq!(clean_word("Hello,"), "Hello");
        assert_eq!(clean_word("world!"), "world");
        assert_eq!(clean_word("don't"), "don't");
        assert_eq!(clean_word("\"quoted\""), "\"quoted\"");
        assert_eq!(clean_word("well-known_fact"), "well-known_fact");
        assert_eq!(clean_word("(1957)."), "1957");
        assert_eq!(clean_word("नमस्ते।"), "नमस्ते");
    }

    #[test]
    fn test_rejects_out_of_order_words() {
        let input = words(&[("late", 1000.0, 1200.0), ("early", 500.0, 700.0)]);
        let err = generate_captions(&input, &CaptionConfig::default()).unwrap_err();
        assert!(matches!(err, ReelError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_inverted_and_invalid_timestamps() {
        let config = CaptionConfig::default();
        for bad in [
            Word::new("x", 500.0, 100.0),
            Word::new("x", -1.0, 100.0),
            Word::new("x", f64::NAN, 100.0),
            Word::new("x", 0.0, f64::INFINITY),
        ] {
            let err = generate_captions(&[bad], &config).unwrap_err();
            assert!(matches!(err, ReelError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_closed_windows_meet_a_threshold() {
        let config = CaptionConfig::default();
        let texts = ["The", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog", "again"];
        let mut input = Vec::new();
        let mut t = 0.0;
        for (i, text) in texts.iter().cycle().take(60).enumerate() {
            let len = 150.0 + (i % 7) as f64 * 110.0;
            input.push(Word::new(*text, t, t + len));
            t += len + (i % 3) as f64 * 40.0;
        }

        let captions = generate_captions(&input, &config).unwrap();
        assert!(!captions.is_empty());

        for caption in &captions[..captions.len() - 1] {
            assert!(
                caption.text.chars().count() >= config.max_caption_size
                    || caption.duration() >= config.min_duration,
                "caption {:?} closed without meeting a threshold",
                caption
            );
        }

        for pair in captions.windows(2) {
            assert!(pair[0].interval.start <= pair[1].interval.start);
            assert!(pair[0].interval.end <= pair[1].interval.start);
        }

        let rebuilt: Vec<String> = captions.iter().map(|c| c.text.clone()).collect();
        let expected: Vec<&str> = texts.iter().cycle().take(60).copied().collect();
        assert_eq!(rebuilt.join(" "), expected.join(" "));
    }
}
