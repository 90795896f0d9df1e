//! OpenAI-compatible client configuration with sensible defaults.
//!
//! Script and search-term generation may point at any OpenAI-compatible
//! endpoint (for example Groq) through `api_base`.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with configured timeout.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_for(None, None)
}

/// Create a client for a specific endpoint and key.
///
/// `None` keeps the library defaults (api.openai.com, `OPENAI_API_KEY`).
pub fn create_client_for(api_base: Option<&str>, api_key: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base.filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config = config.with_api_key(key);
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(config).with_http_client(http_client)
}

/// Leading `max_chars` characters of a model response, for logs and errors.
pub fn response_preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
