//! Mapping caption windows to timed footage search terms.

use crate::captions::Caption;
use crate::config::Prompts;
use crate::error::{ReelError, Result};
use crate::openai::{create_client_for, response_preview};
use crate::timeline::TimeInterval;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// A span of the timeline and the phrases used to find footage for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTermInterval {
    pub interval: TimeInterval,
    /// Search phrases, most relevant first.
    pub terms: Vec<String>,
}

impl SearchTermInterval {
    pub fn new(start: f64, end: f64, terms: Vec<String>) -> Self {
        Self {
            interval: TimeInterval::new(start, end),
            terms,
        }
    }
}

/// Trait for services that pick search terms for caption windows.
#[async_trait]
pub trait SearchTermMapper: Send + Sync {
    /// Map captions to search-term intervals spanning `[0, audio_duration]`.
    async fn map(
        &self,
        script: &str,
        captions: &[Caption],
        audio_duration: f64,
    ) -> Result<Vec<SearchTermInterval>>;
}

/// LLM-backed search term mapper.
pub struct LlmSearchTermMapper {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_terms: usize,
    prompts: Prompts,
}

#[derive(Debug, Deserialize)]
struct LlmMapping {
    segments: Vec<LlmSegment>,
}

#[derive(Debug, Deserialize)]
struct LlmSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    terms: Vec<String>,
}

impl LlmSearchTermMapper {
    pub fn new(model: &str, max_terms: usize) -> Self {
        Self::with_endpoint(model, max_terms, None, None)
    }

    /// Use an OpenAI-compatible endpoint other than the default.
    pub fn with_endpoint(
        model: &str,
        max_terms: usize,
        api_base: Option<&str>,
        api_key: Option<&str>,
    ) -> Self {
        Self {
            client: create_client_for(api_base, api_key),
            model: model.to_string(),
            max_terms: max_terms.max(1),
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Parse the LLM response into raw intervals.
    fn parse_mapping(response: &str) -> Result<Vec<SearchTermInterval>> {
        let json_start = response.find('{');
        let json_end = response.rfind('}');

        let json_str = match (json_start, json_end) {
            (Some(start), Some(end)) if end > start => &response[start..=end],
            _ => response,
        };

        let mapping: LlmMapping = serde_json::from_str(json_str).map_err(|e| {
            ReelError::SearchTerms(format!(
                "Failed to parse search term response: {}. Response was: {}",
                e,
                response_preview(response, 500)
            ))
        })?;

        Ok(mapping
            .segments
            .into_iter()
            .map(|s| SearchTermInterval::new(s.start, s.end, s.terms))
            .collect())
    }

    async fn ask_llm(&self, script: &str, captions: &[Caption]) -> Result<String> {
        let timed: Vec<serde_json::Value> = captions
            .iter()
            .map(|c| {
                serde_json::json!({
                    "start": c.interval.start,
                    "end": c.interval.end,
                    "text": c.text,
                })
            })
            .collect();

        let mut vars = HashMap::new();
        vars.insert("script".to_string(), script.to_string());
        vars.insert("captions".to_string(), serde_json::to_string_pretty(&timed)?);
        vars.insert("max_terms".to_string(), self.max_terms.to_string());

        let system_message = self.prompts.render_with_custom(&self.prompts.search_terms.system, &vars);
        let user_message = self.prompts.render_with_custom(&self.prompts.search_terms.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .map_err(|e| ReelError::SearchTerms(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| ReelError::SearchTerms(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| ReelError::SearchTerms(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            ReelError::OpenAI(format!("Failed to get search term response: {}", e))
        })?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ReelError::SearchTerms("Empty response from LLM".to_string()))
    }
}

/// Clean raw intervals and fit them onto `[0, audio_duration]`.
///
/// Terms are trimmed, deduplicated and capped at `max_terms`; intervals are
/// sorted by start and clamped, the first is pulled back to 0 and the last
/// stretched to the end of the audio. Gaps and overlaps are left in place for
/// boundary validation and reconciliation to deal with.
fn fit_to_timeline(
    mut intervals: Vec<SearchTermInterval>,
    audio_duration: f64,
    max_terms: usize,
) -> Vec<SearchTermInterval> {
    intervals.retain(|s| s.interval.start.is_finite() && s.interval.end.is_finite());

    for item in &mut intervals {
        let mut seen = Vec::new();
        for term in item.terms.drain(..) {
            let term = term.trim().to_string();
            if !term.is_empty() && !seen.iter().any(|t: &String| t.eq_ignore_ascii_case(&term)) {
                seen.push(term);
            }
        }
        seen.truncate(max_terms);
        item.terms = seen;

        item.interval.start = item.interval.start.clamp(0.0, audio_duration);
        item.interval.end = item.interval.end.clamp(item.interval.start, audio_duration);
    }

    intervals.sort_by(|a, b| a.interval.start.total_cmp(&b.interval.start));

    if let Some(first) = intervals.first_mut() {
        first.interval.start = 0.0;
    }
    if let Some(last) = intervals.last_mut() {
        last.interval.end = audio_duration;
    }

    intervals
}

/// One interval per caption, with the caption's longest words as terms.
///
/// Intervals run from each caption's start to the next one's, so together
/// they tile `[0, audio_duration]`.
pub fn fallback_search_terms(
    captions: &[Caption],
    audio_duration: f64,
    max_terms: usize,
) -> Vec<SearchTermInterval> {
    let mut intervals = Vec::with_capacity(captions.len());

    for (idx, caption) in captions.iter().enumerate() {
        let start = if idx == 0 { 0.0 } else { caption.interval.start };
        let end = captions
            .get(idx + 1)
            .map(|next| next.interval.start)
            .unwrap_or(audio_duration.max(caption.interval.end));

        let mut words: Vec<&str> = caption
            .text
            .split_whitespace()
            .filter(|w| w.chars().count() >= 3)
            .collect();
        words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

        let mut terms: Vec<String> = Vec::new();
        for word in words {
            let word = word.trim_matches(|c| c == '"' || c == '\'').to_lowercase();
            if !word.is_empty() && !terms.contains(&word) {
                terms.push(word);
            }
            if terms.len() >= max_terms {
                break;
            }
        }

        intervals.push(SearchTermInterval::new(start, end, terms));
    }

    intervals
}

#[async_trait]
impl SearchTermMapper for LlmSearchTermMapper {
    #[instrument(skip(self, script, captions), fields(captions = captions.len()))]
    async fn map(
        &self,
        script: &str,
        captions: &[Caption],
        audio_duration: f64,
    ) -> Result<Vec<SearchTermInterval>> {
        if captions.is_empty() {
            return Ok(Vec::new());
        }

        let raw = match self.ask_llm(script, captions).await {
            Ok(content) => {
                debug!("LLM search term response: {}", response_preview(&content, 500));
                Self::parse_mapping(&content)
            }
            Err(e) => Err(e),
        };

        match raw {
            Ok(intervals) if !intervals.is_empty() => {
                let fitted = fit_to_timeline(intervals, audio_duration, self.max_terms);
                info!("Mapped captions to {} search term intervals", fitted.len());
                Ok(fitted)
            }
            Ok(_) => {
                warn!("LLM returned no search terms, using caption words");
                Ok(fallback_search_terms(captions, audio_duration, self.max_terms))
            }
            Err(e) => {
                warn!("Search term mapping failed, using caption words: {}", e);
                Ok(fallback_search_terms(captions, audio_duration, self.max_terms))
            }
        }
    }
}
