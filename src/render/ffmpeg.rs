//! ffmpeg-based compositor.

use super::{CompositionJob, Compositor, MediaProbe};
use crate::background::{is_total_resolution_failure, reconcile_intervals, BackgroundSegment};
use crate::captions::{format_captions, OutputFormat};
use crate::config::{MissingBackground, RenderSettings};
use crate::error::{ReelError, Result};
use crate::timeline::TimeInterval;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Segments shorter than this are not worth an encoder pass.
const MIN_PART_SECONDS: f64 = 0.001;

/// Renders videos by shelling out to ffmpeg.
pub struct FfmpegCompositor {
    client: reqwest::Client,
    settings: RenderSettings,
    work_root: PathBuf,
    max_concurrent_downloads: usize,
}

impl FfmpegCompositor {
    /// Create a compositor that keeps per-job working files under `work_root`.
    pub fn new(settings: RenderSettings, work_root: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            settings,
            work_root: work_root.into(),
            max_concurrent_downloads: 3,
        })
    }

    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    /// Download every clip once. Failed downloads are logged and left out.
    async fn download_clips(&self, urls: &[String], dir: &Path) -> HashMap<String, PathBuf> {
        let jobs: Vec<(String, PathBuf)> = urls
            .iter()
            .enumerate()
            .map(|(idx, url)| {
                let dest = dir.join(format!("clip_{:03}.{}", idx, clip_extension(url)));
                (url.clone(), dest)
            })
            .collect();

        let results: Vec<(String, Result<PathBuf>)> = stream::iter(jobs)
            .map(|(url, dest)| async move {
                let result = self.download(&url, &dest).await.map(|_| dest);
                (url, result)
            })
            .buffer_unordered(self.max_concurrent_downloads)
            .collect()
            .await;

        let mut clips = HashMap::new();
        for (url, result) in results {
            match result {
                Ok(path) => {
                    clips.insert(url, path);
                }
                Err(e) => warn!("Failed to download clip {}: {}", url, e),
            }
        }
        clips
    }

    async fn render_part(&self, clip: &Path, duration: f64, dest: &Path) -> Result<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .arg("-loglevel").arg("error")
            .arg("-stream_loop").arg("-1")
            .arg("-i").arg(clip)
            .arg("-t").arg(format!("{:.3}", duration))
            .arg("-an")
            .arg("-vf").arg(video_filter(&self.settings))
            .arg("-c:v").arg("libx264")
            .arg("-preset").arg(&self.settings.preset)
            .arg("-pix_fmt").arg("yuv420p")
            .arg(dest);
        run(cmd, "ffmpeg").await
    }

    async fn render_blank(&self, dest: &Path, duration: f64) -> Result<()> {
        let source = format!(
            "color=c={}:s={}x{}:r={}:d={:.3}",
            self.settings.background_color,
            self.settings.width,
            self.settings.height,
            self.settings.fps,
            duration
        );

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .arg("-loglevel").arg("error")
            .arg("-f").arg("lavfi")
            .arg("-i").arg(source)
            .arg("-c:v").arg("libx264")
            .arg("-preset").arg(&self.settings.preset)
            .arg("-pix_fmt").arg("yuv420p")
            .arg(dest);
        run(cmd, "ffmpeg").await
    }

    /// Render one part per segment and join them into `dest`.
    async fn render_footage(
        &self,
        background: &[BackgroundSegment],
        clips: &HashMap<String, PathBuf>,
        audio_duration: f64,
        dir: &Path,
        dest: &Path,
    ) -> Result<()> {
        let parts = plan_parts(background, audio_duration);
        if parts.is_empty() {
            return self.render_blank(dest, audio_duration).await;
        }

        let mut part_paths = Vec::with_capacity(parts.len());
        for (idx, (url, duration)) in parts.iter().enumerate() {
            let clip = clips.get(url).ok_or_else(|| {
                ReelError::Render(format!("Clip {} was not downloaded", url))
            })?;
            let part = dir.join(format!("part_{:03}.mp4", idx));
            debug!("Rendering part {} ({:.2}s)", idx, duration);
            self.render_part(clip, *duration, &part).await?;
            part_paths.push(part);
        }

        let list_path = dir.join("parts.txt");
        tokio::fs::write(&list_path, concat_list(&part_paths)).await?;

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .arg("-loglevel").arg("error")
            .arg("-f").arg("concat")
            .arg("-safe").arg("0")
            .arg("-i").arg(&list_path)
            .arg("-c").arg("copy")
            .arg(dest);
        run(cmd, "ffmpeg").await
    }

    async fn mux(&self, job: &CompositionJob, background: &Path, dir: &Path, output: &Path) -> Result<()> {
        let audio = std::path::absolute(&job.audio_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.current_dir(dir)
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg("-i").arg(background)
            .arg("-i").arg(&audio)
            .arg("-map").arg("0:v:0")
            .arg("-map").arg("1:a:0");

        if job.captions.iter().any(|c| !c.text.trim().is_empty()) {
            tokio::fs::write(dir.join("captions.srt"), format_captions(&job.captions, OutputFormat::Srt)).await?;
            cmd.arg("-vf").arg(subtitle_filter(&self.settings, "captions.srt"));
        }

        cmd.arg("-c:v").arg("libx264")
            .arg("-preset").arg(&self.settings.preset)
            .arg("-b:v").arg(&self.settings.video_bitrate)
            .arg("-pix_fmt").arg("yuv420p")
            .arg("-c:a").arg("aac")
            .arg("-b:a").arg("192k")
            .arg("-t").arg(format!("{:.3}", job.audio_duration))
            .arg("-movflags").arg("+faststart")
            .arg(output);
        run(cmd, "ffmpeg").await
    }
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    #[instrument(skip(self, job), fields(id = %job.id, segments = job.background.len()))]
    async fn compose(&self, job: CompositionJob) -> Result<PathBuf> {
        if !(job.audio_duration.is_finite() && job.audio_duration > 0.0) {
            return Err(ReelError::InvalidInput(format!(
                "audio duration must be positive, got {}",
                job.audio_duration
            )));
        }

        tokio::fs::create_dir_all(&self.work_root).await?;
        let work_dir = tempfile::Builder::new()
            .prefix(&format!("{}-", job.id))
            .tempdir_in(&self.work_root)?;
        let dir = work_dir.path();

        let mut background = job.background.clone();
        let clips = if background.is_empty() {
            HashMap::new()
        } else {
            let urls = unique_urls(&background);
            let clips = self.download_clips(&urls, dir).await;
            if clips.len() < urls.len() {
                for segment in &mut background {
                    if segment.video_url.as_ref().is_some_and(|url| !clips.contains_key(url)) {
                        segment.video_url = None;
                    }
                }
                background = reconcile_intervals(background);
            }
            clips
        };

        let background_path = dir.join("background.mp4");
        if is_total_resolution_failure(&background) {
            match self.settings.missing_background {
                MissingBackground::Abort => return Err(ReelError::NoBackgroundVideo),
                MissingBackground::Blank => {
                    warn!("No background footage, rendering over {}", self.settings.background_color);
                    self.render_blank(&background_path, job.audio_duration).await?;
                }
            }
        } else {
            self.render_footage(&background, &clips, job.audio_duration, dir, &background_path)
                .await?;
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let output = std::path::absolute(&job.output_path)?;
        self.mux(&job, &background_path, dir, &output).await?;

        info!("Rendered {}", output.display());
        Ok(output)
    }
}

/// Run an external tool, mapping a missing binary to `ToolNotFound`.
async fn run(mut cmd: Command, tool: &str) -> Result<()> {
    let result = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ReelError::Render(format!("{} failed: {}", tool, err.trim())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReelError::ToolNotFound(tool.into()))
        }
        Err(e) => Err(ReelError::Render(format!("{} error: {e}", tool))),
    }
}

/// Queries the duration of a media file using ffprobe with JSON output.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReelError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(ReelError::ToolFailed(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(ReelError::ToolFailed(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    parse_probe_duration(&json_str)
}

/// [`MediaProbe`] backed by ffprobe.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeProbe;

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn duration(&self, path: &Path) -> Result<f64> {
        probe_duration(path).await
    }
}

fn parse_probe_duration(json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| ReelError::ToolFailed("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .ok_or_else(|| ReelError::ToolFailed("Could not determine media duration".into()))
}

/// Distinct clip URLs in timeline order.
fn unique_urls(background: &[BackgroundSegment]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in background.iter().filter_map(|s| s.video_url.as_ref()) {
        if !urls.contains(url) {
            urls.push(url.clone());
        }
    }
    urls
}

/// File extension for a downloaded clip, taken from the URL path.
fn clip_extension(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
        })
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "mp4".to_string())
}

/// One `(clip url, seconds)` pair per playable segment.
///
/// Zero-width segments are skipped. The first part also covers any time
/// before its interval starts, and the last part is stretched so the
/// background runs at least until the end of the narration.
fn plan_parts(background: &[BackgroundSegment], audio_duration: f64) -> Vec<(String, f64)> {
    let playable: Vec<&BackgroundSegment> = background
        .iter()
        .filter(|s| s.is_resolved() && is_playable(&s.interval))
        .collect();

    let mut parts: Vec<(String, f64)> = playable
        .iter()
        .filter_map(|s| s.video_url.clone().map(|url| (url, s.interval.duration())))
        .collect();

    // Parts are concatenated from t=0, so a late first interval is covered
    // by its own clip.
    if let (Some(first), Some(segment)) = (parts.first_mut(), playable.first()) {
        first.1 += segment.interval.start.max(0.0);
    }

    if let (Some(last), Some(segment)) = (parts.last_mut(), playable.last()) {
        if audio_duration > segment.interval.end {
            last.1 += audio_duration - segment.interval.end;
        }
    }

    parts
}

fn is_playable(interval: &TimeInterval) -> bool {
    !interval.is_degenerate() && interval.duration() >= MIN_PART_SECONDS
}

fn video_filter(settings: &RenderSettings) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},fps={fps},setsar=1",
        w = settings.width,
        h = settings.height,
        fps = settings.fps
    )
}

fn subtitle_filter(settings: &RenderSettings, srt_name: &str) -> String {
    format!(
        "subtitles={}:force_style='FontName={},FontSize={},PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=1,Outline={},Alignment=2,MarginV={}'",
        srt_name, settings.font, settings.font_size, settings.outline, settings.margin_v
    )
}

/// Concat demuxer input listing `parts` in order.
fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}
