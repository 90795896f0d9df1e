//! Narration script generation.

use crate::config::{ContentType, Prompts};
use crate::error::{ReelError, Result};
use crate::openai::{create_client_for, response_preview};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Trait for services that write a narration script for a topic.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn write_script(
        &self,
        topic: &str,
        language: &str,
        content_type: ContentType,
    ) -> Result<String>;
}

/// Chat-completion backed script writer.
pub struct LlmScriptWriter {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    prompts: Prompts,
}

#[derive(Debug, Deserialize)]
struct ScriptResponse {
    script: String,
}

impl LlmScriptWriter {
    pub fn new(model: &str) -> Self {
        Self::with_endpoint(model, None, None)
    }

    /// Use an OpenAI-compatible endpoint other than the default.
    pub fn with_endpoint(model: &str, api_base: Option<&str>, api_key: Option<&str>) -> Self {
        Self {
            client: create_client_for(api_base, api_key),
            model: model.to_string(),
            temperature: 0.0,
            prompts: Prompts::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Extract the script from a model response.
    ///
    /// Responses wrapped in prose or code fences are accepted as long as the
    /// outermost braces enclose a JSON object with a `script` key.
    fn parse_script(response: &str) -> Result<String> {
        let parsed = serde_json::from_str::<ScriptResponse>(response).or_else(|_| {
            match (response.find('{'), response.rfind('}')) {
                (Some(start), Some(end)) if end > start => {
                    serde_json::from_str::<ScriptResponse>(&response[start..=end])
                }
                _ => serde_json::from_str::<ScriptResponse>(response),
            }
        });

        let script = parsed
            .map_err(|e| {
                ReelError::Script(format!(
                    "Failed to parse script response: {}. Response was: {}",
                    e,
                    response_preview(response, 500)
                ))
            })?
            .script
            .trim()
            .to_string();

        if script.is_empty() {
            return Err(ReelError::Script("Model returned an empty script".to_string()));
        }
        Ok(script)
    }
}

#[async_trait]
impl ScriptWriter for LlmScriptWriter {
    #[instrument(skip(self))]
    async fn write_script(
        &self,
        topic: &str,
        language: &str,
        content_type: ContentType,
    ) -> Result<String> {
        if topic.trim().is_empty() {
            return Err(ReelError::InvalidInput("Topic must not be empty".to_string()));
        }

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.trim().to_string());
        vars.insert("language".to_string(), language.to_string());

        let system_message = self
            .prompts
            .render_with_custom(self.prompts.script_template(content_type), &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .map_err(|e| ReelError::Script(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(topic.trim())
                .build()
                .map_err(|e| ReelError::Script(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| ReelError::Script(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ReelError::OpenAI(format!("Failed to get script response: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ReelError::Script("Empty response from LLM".to_string()))?;

        debug!("LLM script response: {}", response_preview(&content, 500));
        let script = Self::parse_script(&content)?;
        info!("Generated {} script ({} words)", content_type, script.split_whitespace().count());
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let script = LlmScriptWriter::parse_script(r#"{"script": "  Breaking news today.  "}"#).unwrap();
        assert_eq!(script, "Breaking news today.");
    }

    #[test]
    fn test_parse_wrapped_json() {
        let response = "Here you go:\n```json\n{\"script\": \"Bananas are berries.\"}\n```\nEnjoy!";
        assert_eq!(LlmScriptWriter::parse_script(response).unwrap(), "Bananas are berries.");
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let err = LlmScriptWriter::parse_script(r#"{"text": "nope"}"#).unwrap_err();
        assert!(matches!(err, ReelError::Script(_)));
    }

    #[test]
    fn test_parse_rejects_empty_script() {
        assert!(LlmScriptWriter::parse_script(r#"{"script": "   "}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_long_devanagari_reply() {
        let err = LlmScriptWriter::parse_script(&"ज्वालामुखी फटता है। ".repeat(60)).unwrap_err();
        assert!(matches!(err, ReelError::Script(_)));
    }
}
