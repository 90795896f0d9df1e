//! Captions command: caption an existing audio file.

use crate::captions::{format_captions, generate_captions, OutputFormat};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::transcription::{WhisperWordTranscriber, WordTranscriber};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the captions command.
pub async fn run_captions(
    audio: &str,
    format: &str,
    output: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let audio_path = Settings::expand_path(audio);
    if !audio_path.exists() {
        anyhow::bail!("Audio file not found: {}", audio_path.display());
    }

    preflight::check(Operation::Captions)?;

    let transcriber = WhisperWordTranscriber::with_model(&settings.transcription.model);
    let spinner = Output::spinner("Transcribing...");
    let words = transcriber
        .transcribe_words(&audio_path, settings.transcription.language.as_deref())
        .await;
    spinner.finish_and_clear();
    let words = words?;

    let captions = generate_captions(&words, &settings.captions)?;
    let rendered = format_captions(&captions, format);

    match output {
        Some(path) => {
            let path = Settings::expand_path(path);
            write_output(&path, &rendered)?;
            Output::success(&format!(
                "Wrote {} captions to {}",
                captions.len(),
                path.display()
            ));
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
