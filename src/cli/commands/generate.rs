//! Generate command implementation.

use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{ContentType, Settings};
use crate::orchestrator::{GenerationRequest, Orchestrator};
use anyhow::Result;

/// Run the generate command.
pub async fn run_generate(
    topic: &str,
    voice: Option<String>,
    language: Option<String>,
    content_type: Option<&str>,
    no_store: bool,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Generate)?;
    if !preflight::footage_available(&settings) {
        Output::warning("PEXELS_API_KEY not set; the video will have a plain background.");
    }

    let content_type = match content_type {
        Some(name) => Some(name.parse::<ContentType>().map_err(|e| anyhow::anyhow!(e))?),
        None => None,
    };

    let orchestrator = Orchestrator::new(settings)?;
    let request = GenerationRequest {
        topic: topic.to_string(),
        voice,
        language,
        content_type,
    };

    let spinner = Output::spinner(&format!("Generating video about '{}'...", topic));
    let result = orchestrator.generate(&request).await;
    spinner.finish_and_clear();

    let video = match result {
        Ok(video) => video,
        Err(e) => {
            Output::error(&format!("Generation failed: {}", e));
            return Err(e.into());
        }
    };

    Output::success("Video generated");
    Output::kv("File", &video.video_path.display().to_string());
    Output::kv("Length", &format_duration(video.audio_duration));
    Output::kv("Captions", &video.captions.len().to_string());
    Output::kv(
        "Background clips",
        &video
            .background
            .iter()
            .filter(|s| s.is_resolved())
            .count()
            .to_string(),
    );
    Output::header("Script");
    Output::script_preview(&video.script);

    if !no_store {
        let metadata = orchestrator.record(&video).await?;
        println!();
        Output::kv("Metadata id", &metadata.id.to_string());
    }

    Ok(())
}
