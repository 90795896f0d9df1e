//! Caption output formatting (JSON, SRT, VTT).
//!
//! SRT is what the compositor burns into the video; the other formats are
//! for exporting captions from the CLI.

use super::Caption;
use serde::Serialize;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Json,
    Srt,
    Vtt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            _ => Err(format!("Unknown format: {}. Use json, srt, or vtt.", s)),
        }
    }
}

/// JSON-serializable caption list for export.
#[derive(Debug, Serialize)]
pub struct CaptionsExport {
    pub duration_seconds: f64,
    pub captions: Vec<CaptionExport>,
}

#[derive(Debug, Serialize)]
pub struct CaptionExport {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl From<&[Caption]> for CaptionsExport {
    fn from(captions: &[Caption]) -> Self {
        Self {
            duration_seconds: captions.last().map(|c| c.interval.end).unwrap_or(0.0),
            captions: captions
                .iter()
                .map(|c| CaptionExport {
                    text: c.text.clone(),
                    start_seconds: c.interval.start,
                    end_seconds: c.interval.end,
                })
                .collect(),
        }
    }
}

/// Format captions for output.
pub fn format_captions(captions: &[Caption], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(captions),
        OutputFormat::Srt => format_srt(captions),
        OutputFormat::Vtt => format_vtt(captions),
    }
}

fn format_json(captions: &[Caption]) -> String {
    let export = CaptionsExport::from(captions);
    serde_json::to_string_pretty(&export).unwrap_or_else(|_| "{}".to_string())
}

/// Format as SRT (SubRip). Captions without text are skipped.
fn format_srt(captions: &[Caption]) -> String {
    let mut output = String::new();

    for (i, caption) in captions.iter().filter(|c| !c.text.is_empty()).enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(caption.interval.start),
            format_srt_timestamp(caption.interval.end)
        ));
        output.push_str(&caption.text);
        output.push_str("\n\n");
    }

    output
}

fn format_vtt(captions: &[Caption]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for (i, caption) in captions.iter().filter(|c| !c.text.is_empty()).enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(caption.interval.start),
            format_vtt_timestamp(caption.interval.end)
        ));
        output.push_str(&caption.text);
        output.push_str("\n\n");
    }

    output
}

fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// Format timestamp for SRT (00:00:00,000).
fn format_srt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(seconds);
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Format timestamp for VTT (00:00:00.000).
fn format_vtt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}
