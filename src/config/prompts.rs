//! Prompt templates for Reelsmith.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of narration to write for a topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// A short story related to the topic.
    Storytelling,
    /// A list of surprising facts.
    InterestingFacts,
    /// News-style headlines.
    #[default]
    News,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [
        ContentType::Storytelling,
        ContentType::InterestingFacts,
        ContentType::News,
    ];

    /// Parse a content type, falling back to the default for unknown names.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, using {}", e, ContentType::default());
            ContentType::default()
        })
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "storytelling" | "story" => Ok(ContentType::Storytelling),
            "interesting-facts" | "interesting_facts" | "interestingfacts" | "facts" => {
                Ok(ContentType::InterestingFacts)
            }
            "news" => Ok(ContentType::News),
            _ => Err(format!("Unknown content type: {}", s)),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Storytelling => write!(f, "storytelling"),
            ContentType::InterestingFacts => write!(f, "interesting-facts"),
            ContentType::News => write!(f, "news"),
        }
    }
}

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub script: ScriptPrompts,
    pub search_terms: SearchTermPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Script prompts, one per content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPrompts {
    pub storytelling: String,
    pub interesting_facts: String,
    pub news: String,
}

impl Default for ScriptPrompts {
    fn default() -> Self {
        Self {
            storytelling: r#"Write a YouTube Shorts script that tells a captivating short story related to the requested topic.
The story must be concise and engaging, and fit within 50 seconds (around 140 words).
Write the script in {{language}}.

Example for the topic "inventions":
{"script": "Bubble wrap started as a failed wallpaper. In 1957, two engineers sealed two shower curtains together, trapping air bubbles in between. Nobody wanted the wallpaper, but the cushioning was remarkable. When IBM shipped its first computers, bubble wrap protected them. Today it guards millions of parcels, and popping it is oddly satisfying."}

Keep it brief, highly interesting, and unique.
Output only a parsable JSON object with the key "script".

The topic is: {{topic}}"#
                .to_string(),

            interesting_facts: r#"You write scripts for a YouTube Shorts channel about facts.
Each script lasts under 50 seconds (approximately 140 words), is original, and keeps viewers hooked.
Write the script in {{language}}.

For example, a request for "weird facts" could produce:
Weird facts you don't know:
- Bananas are berries, but strawberries aren't.
- A single cloud can weigh over a million pounds.
- Octopuses have three hearts and blue blood.

Create the best short script for the requested kind of facts.
Output only a parsable JSON object with the key "script", like {"script": "Here is the script ..."}.

The topic is: {{topic}}"#
                .to_string(),

            news: r#"Write news-style headlines for a YouTube Short about "{{topic}}".
- Be informative and to the point.
- Open with a strong headline about real events (e.g. "Breaking News: ...").
- Cover the most important details in 50 seconds (about 140 words).
- Use a professional yet engaging tone.
- Write in {{language}}.
- Output only a valid JSON object like {"script": "Your script here"}."#
                .to_string(),
        }
    }
}

/// Prompts for mapping captions to footage search terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTermPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SearchTermPrompts {
    fn default() -> Self {
        Self {
            system: r#"You pick stock-footage search terms for short videos.

Given a narration script and its timed captions, split the timeline into consecutive intervals of roughly 2-4 seconds and give each interval up to {{max_terms}} visually concrete English search terms, most relevant first.

Rules:
- Intervals must be consecutive, must not overlap, and must cover the captions from the first start to the last end.
- Terms describe things a camera can film ("city traffic at night", "rocket launch"), never abstract ideas.
- Write terms in English even when the captions are in another language.
- Respond with JSON only."#
                .to_string(),

            user: r#"Script:
{{script}}

Timed captions (JSON, seconds):
{{captions}}

Return JSON: {"segments": [{"start": 0.0, "end": 2.5, "terms": ["term one", "term two"]}]}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let script_path = custom_path.join("script.toml");
            if script_path.exists() {
                let content = std::fs::read_to_string(&script_path)?;
                prompts.script = toml::from_str(&content)?;
            }

            let search_terms_path = custom_path.join("search_terms.toml");
            if search_terms_path.exists() {
                let content = std::fs::read_to_string(&search_terms_path)?;
                prompts.search_terms = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// The script template for a content type.
    pub fn script_template(&self, content_type: ContentType) -> &str {
        match content_type {
            ContentType::Storytelling => &self.script.storytelling,
            ContentType::InterestingFacts => &self.script.interesting_facts,
            ContentType::News => &self.script.news,
        }
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_every_content_type_has_a_template() {
        let prompts = Prompts::default();
        for content_type in ContentType::ALL {
            let template = prompts.script_template(content_type);
            assert!(template.contains("{{topic}}"), "{} lacks topic", content_type);
            assert!(template.contains("{{language}}"), "{} lacks language", content_type);
        }
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!("Storytelling".parse::<ContentType>().unwrap(), ContentType::Storytelling);
        assert_eq!("Interesting-Facts".parse::<ContentType>().unwrap(), ContentType::InterestingFacts);
        assert_eq!("news".parse::<ContentType>().unwrap(), ContentType::News);
        assert!("poetry".parse::<ContentType>().is_err());
        assert_eq!(ContentType::parse_or_default("poetry"), ContentType::News);
    }

    #[test]
    fn test_content_type_display_roundtrip() {
        for content_type in ContentType::ALL {
            assert_eq!(content_type.to_string().parse::<ContentType>().unwrap(), content_type);
        }
    }

    #[test]
    fn test_render_template() {
        let template = "News about {{topic}} in {{language}}.";
        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), "space".to_string());
        vars.insert("language".to_string(), "English".to_string());

        assert_eq!(Prompts::render(template, &vars), "News about space in English.");
    }

    #[test]
    fn test_custom_variables_are_overridden() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("channel".to_string(), "Daily Bytes".to_string());
        prompts.variables.insert("topic".to_string(), "ignored".to_string());

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), "volcanoes".to_string());

        let out = prompts.render_with_custom("{{channel}}: {{topic}}", &vars);
        assert_eq!(out, "Daily Bytes: volcanoes");
    }

    #[test]
    fn test_load_custom_script_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("script.toml"),
            "news = \"Headlines on {{topic}} ({{language}})\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.script_template(ContentType::News), "Headlines on {{topic}} ({{language}})");
        assert!(prompts.script_template(ContentType::Storytelling).contains("story"));
    }
}
