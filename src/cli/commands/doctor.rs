//! Doctor command: can this machine render a video?

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Pass,
    Warn,
    Fail,
}

/// Outcome of one diagnostic.
#[derive(Debug)]
struct Check {
    label: String,
    level: Level,
    detail: String,
    fix: Option<String>,
}

impl Check {
    fn pass(label: &str, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            level: Level::Pass,
            detail: detail.into(),
            fix: None,
        }
    }

    fn warn(label: &str, detail: impl Into<String>, fix: &str) -> Self {
        Self {
            label: label.to_string(),
            level: Level::Warn,
            detail: detail.into(),
            fix: Some(fix.to_string()),
        }
    }

    fn fail(label: &str, detail: impl Into<String>, fix: &str) -> Self {
        Self {
            label: label.to_string(),
            level: Level::Fail,
            detail: detail.into(),
            fix: Some(fix.to_string()),
        }
    }

    fn print(&self) {
        let mark = match self.level {
            Level::Pass => style("✓").green(),
            Level::Warn => style("!").yellow(),
            Level::Fail => style("✗").red(),
        };
        println!("  {} {} - {}", mark, style(&self.label).bold(), self.detail);
        if let Some(fix) = &self.fix {
            println!("    {} {}", style("→").dim(), style(fix).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&str>) -> anyhow::Result<()> {
    Output::header("Reelsmith Doctor");

    let config_path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    let sections = [
        ("Media tools", vec![ffmpeg_check(), ffprobe_check()]),
        ("Credentials", credential_checks(settings)),
        ("Models", model_checks(settings)),
        ("Rendering", vec![render_check(settings)]),
        (
            "Storage",
            vec![
                writable_dir_check("Temp directory", &settings.temp_dir()),
                writable_dir_check("Output directory", &settings.output_dir()),
                database_check(&settings.sqlite_path()),
                config_file_check(&config_path),
            ],
        ),
    ];

    let mut failures = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("\n{}", style(title).bold());
        for check in checks {
            check.print();
            match check.level {
                Level::Fail => failures += 1,
                Level::Warn => warnings += 1,
                Level::Pass => {}
            }
        }
    }
    println!();

    if failures > 0 {
        Output::error(&format!("{} problem(s) will stop video generation.", failures));
        anyhow::bail!("doctor found {} failing check(s)", failures);
    } else if warnings > 0 {
        Output::warning(&format!("Ready, with {} warning(s).", warnings));
    } else {
        Output::success("Ready to generate videos.");
    }

    Ok(())
}

fn tool_output(tool: &str, args: &[&str]) -> std::io::Result<std::process::Output> {
    Command::new(tool).args(args).output()
}

fn ffmpeg_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install ffmpeg from your package manager (built with libass)"
    } else {
        "Download a build with libass from https://ffmpeg.org/download.html"
    }
}

/// ffmpeg must exist and carry the libass `subtitles` filter used to burn captions.
fn ffmpeg_check() -> Check {
    let version = match tool_output("ffmpeg", &["-version"]) {
        Ok(out) if out.status.success() => first_line(&out.stdout),
        Ok(_) => return Check::fail("ffmpeg", "installed but not working", ffmpeg_hint()),
        Err(_) => return Check::fail("ffmpeg", "not found on PATH", ffmpeg_hint()),
    };

    match tool_output("ffmpeg", &["-hide_banner", "-filters"]) {
        Ok(out) if has_subtitles_filter(&String::from_utf8_lossy(&out.stdout)) => {
            Check::pass("ffmpeg", version)
        }
        _ => Check::fail(
            "ffmpeg",
            format!("{} (no subtitles filter)", version),
            "Captions need an ffmpeg built with --enable-libass",
        ),
    }
}

fn ffprobe_check() -> Check {
    match tool_output("ffprobe", &["-version"]) {
        Ok(out) if out.status.success() => Check::pass("ffprobe", first_line(&out.stdout)),
        Ok(_) => Check::fail("ffprobe", "installed but not working", ffmpeg_hint()),
        Err(_) => Check::fail("ffprobe", "not found on PATH", ffmpeg_hint()),
    }
}

fn first_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Whether `ffmpeg -filters` lists the `subtitles` filter.
fn has_subtitles_filter(listing: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some("subtitles"))
}

/// Last four characters of a secret.
fn key_tail(key: &str) -> String {
    let count = key.chars().count();
    key.chars().skip(count.saturating_sub(4)).collect()
}

fn credential_checks(settings: &Settings) -> Vec<Check> {
    let openai = match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            Check::pass("OPENAI_API_KEY", format!("set (...{})", key_tail(&key)))
        }
        _ => Check::fail(
            "OPENAI_API_KEY",
            "not set (speech and transcription need it)",
            "export OPENAI_API_KEY='sk-...'",
        ),
    };

    let script_key = match (&settings.script.api_base, &settings.script.api_key) {
        (Some(base), Some(key)) if !key.is_empty() => Check::pass(
            "Script endpoint",
            format!("{} (key ...{})", base, key_tail(key)),
        ),
        (Some(base), _) => Check::warn(
            "Script endpoint",
            format!("{} without its own key", base),
            "Set [script] api_key, or OPENAI_API_KEY is sent to this endpoint",
        ),
        (None, _) => Check::pass("Script endpoint", "api.openai.com"),
    };

    let pexels = match settings.pexels_api_key() {
        Some(key) => Check::pass("PEXELS_API_KEY", format!("set (...{})", key_tail(&key))),
        None => Check::warn(
            "PEXELS_API_KEY",
            format!(
                "not set, backgrounds fall back to {:?}",
                settings.render.missing_background
            ),
            "Get a free key at https://www.pexels.com/api/",
        ),
    };

    vec![openai, script_key, pexels]
}

fn model_checks(settings: &Settings) -> Vec<Check> {
    [
        ("Script model", &settings.script.model),
        ("Search-term model", &settings.search_terms.model),
        ("Speech model", &settings.speech.model),
        ("Transcription model", &settings.transcription.model),
    ]
    .into_iter()
    .map(|(label, model)| {
        if model.trim().is_empty() {
            Check::fail(label, "empty", "Set a model name in the config file")
        } else {
            Check::pass(label, model.as_str())
        }
    })
    .collect()
}

/// x264 with yuv420p needs even frame dimensions.
fn render_check(settings: &Settings) -> Check {
    let render = &settings.render;
    let size = format!("{}x{} @ {} fps", render.width, render.height, render.fps);
    if render.width == 0 || render.height == 0 || render.fps == 0 {
        Check::fail("Output format", size, "Width, height and fps must be positive")
    } else if render.width % 2 != 0 || render.height % 2 != 0 {
        Check::fail("Output format", size, "Width and height must be even for libx264")
    } else {
        Check::pass("Output format", size)
    }
}

fn writable_dir_check(label: &str, dir: &Path) -> Check {
    let shown = dir.display().to_string();
    if let Err(e) = std::fs::create_dir_all(dir) {
        return Check::fail(label, format!("{} ({})", shown, e), "Choose a directory you can create");
    }
    match tempfile::NamedTempFile::new_in(dir) {
        Ok(_) => Check::pass(label, shown),
        Err(e) => Check::fail(label, format!("{} not writable ({})", shown, e), "Fix permissions or change the path"),
    }
}

fn database_check(path: &Path) -> Check {
    match std::fs::metadata(path) {
        Ok(meta) => Check::pass(
            "Metadata database",
            format!("{} ({} KB)", path.display(), meta.len() / 1024),
        ),
        Err(_) => Check::pass(
            "Metadata database",
            format!("{} (created on first stored video)", path.display()),
        ),
    }
}

fn config_file_check(path: &Path) -> Check {
    if path.exists() {
        match Settings::load_from(Some(&path.to_path_buf())) {
            Ok(_) => Check::pass("Config file", path.display().to_string()),
            Err(e) => Check::fail("Config file", e.to_string(), "Fix the TOML or run: reelsmith config edit"),
        }
    } else {
        Check::warn(
            "Config file",
            "none, using defaults",
            "Create one with: reelsmith config edit",
        )
    }
}
