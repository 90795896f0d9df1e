//! Pexels stock-footage resolver.

use super::{BackgroundSegment, ClipResolver, SearchTermInterval};
use crate::config::Orientation;
use crate::error::{ReelError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PEXELS_SEARCH_URL: &str = "https://api.pexels.com/videos/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Clone, Deserialize)]
struct PexelsVideo {
    id: u64,
    width: u32,
    height: u32,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct VideoFile {
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    link: String,
}

/// Resolves search terms to Pexels video file URLs.
pub struct PexelsResolver {
    client: reqwest::Client,
    api_key: String,
    orientation: Orientation,
    per_page: u32,
    target_width: u32,
    target_height: u32,
}

impl PexelsResolver {
    pub fn new(api_key: impl Into<String>, orientation: Orientation) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("reelsmith/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        let (target_width, target_height) = match orientation {
            Orientation::Portrait => (1080, 1920),
            Orientation::Landscape => (1920, 1080),
            Orientation::Square => (1080, 1080),
        };

        Ok(Self {
            client,
            api_key: api_key.into(),
            orientation,
            per_page: 15,
            target_width,
            target_height,
        })
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 80);
        self
    }

    /// Preferred file resolution, usually the render size.
    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<PexelsVideo>> {
        let per_page = self.per_page.to_string();
        let orientation = self.orientation.to_string();

        let response = self
            .client
            .get(PEXELS_SEARCH_URL)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query),
                ("orientation", orientation.as_str()),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReelError::ClipResolution(format!(
                "Pexels returned status {} for '{}'",
                response.status(),
                query
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.videos)
    }

    /// Try each term in order and return the first clip found.
    async fn resolve_one(
        &self,
        item: &SearchTermInterval,
        used: &mut HashSet<u64>,
    ) -> Option<String> {
        let needed = item.interval.duration();

        for term in &item.terms {
            let videos = match self.search(term).await {
                Ok(videos) => videos,
                Err(e) => {
                    warn!("Footage search for '{}' failed: {}", term, e);
                    continue;
                }
            };

            let picked = select_clip(
                &videos,
                needed,
                used,
                self.orientation,
                (self.target_width, self.target_height),
            );

            if let Some((id, link)) = picked {
                debug!("'{}' -> video {}", term, id);
                used.insert(id);
                return Some(link);
            }
            debug!("No usable clip for '{}'", term);
        }

        None
    }
}

fn matches_orientation(width: u32, height: u32, orientation: Orientation) -> bool {
    match orientation {
        Orientation::Portrait => height > width,
        Orientation::Landscape => width > height,
        Orientation::Square => width == height,
    }
}

/// Pick an unused video and its best file.
///
/// Videos at least `needed` seconds long come first, then the one closest in
/// length. Among its files, MP4s nearest the target size win.
fn select_clip(
    videos: &[PexelsVideo],
    needed: f64,
    used: &HashSet<u64>,
    orientation: Orientation,
    target: (u32, u32),
) -> Option<(u64, String)> {
    let mut candidates: Vec<&PexelsVideo> = videos
        .iter()
        .filter(|v| !used.contains(&v.id))
        .filter(|v| matches_orientation(v.width, v.height, orientation))
        .filter(|v| !v.video_files.is_empty())
        .collect();

    candidates.sort_by(|a, b| {
        let short_a = a.duration < needed;
        let short_b = b.duration < needed;
        short_a
            .cmp(&short_b)
            .then_with(|| (a.duration - needed).abs().total_cmp(&(b.duration - needed).abs()))
    });

    candidates.into_iter().find_map(|video| {
        let file = video
            .video_files
            .iter()
            .filter(|f| f.file_type.as_deref().map_or(true, |t| t == "video/mp4"))
            .filter(|f| match (f.width, f.height) {
                (Some(w), Some(h)) => matches_orientation(w, h, orientation),
                _ => true,
            })
            .min_by_key(|f| {
                let w = f.width.unwrap_or(0) as i64;
                let h = f.height.unwrap_or(0) as i64;
                (w - target.0 as i64).abs() + (h - target.1 as i64).abs()
            })?;
        Some((video.id, file.link.clone()))
    })
}

#[async_trait]
impl ClipResolver for PexelsResolver {
    #[instrument(skip(self, terms), fields(intervals = terms.len()))]
    async fn resolve(&self, terms: &[SearchTermInterval]) -> Result<Vec<BackgroundSegment>> {
        let mut used = HashSet::new();
        let mut segments = Vec::with_capacity(terms.len());

        for item in terms {
            let segment = match self.resolve_one(item, &mut used).await {
                Some(url) => BackgroundSegment::resolved(item.interval, url),
                None => BackgroundSegment::absent(item.interval),
            };
            segments.push(segment);
        }

        let resolved = segments.iter().filter(|s| s.is_resolved()).count();
        info!("Resolved {}/{} footage intervals", resolved, segments.len());

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "page": 1,
        "videos": [
            {
                "id": 1, "width": 1920, "height": 1080, "duration": 20,
                "video_files": [{"id": 10, "file_type": "video/mp4", "width": 1920, "height": 1080, "link": "https://x/landscape.mp4"}]
            },
            {
                "id": 2, "width": 1080, "height": 1920, "duration": 3,
                "video_files": [{"id": 20, "file_type": "video/mp4", "width": 1080, "height": 1920, "link": "https://x/short.mp4"}]
            },
            {
                "id": 3, "width": 2160, "height": 3840, "duration": 12,
                "video_files": [
                    {"id": 30, "file_type": "video/mp4", "width": 2160, "height": 3840, "link": "https://x/uhd.mp4"},
                    {"id": 31, "file_type": "video/mp4", "width": 1080, "height": 1920, "link": "https://x/hd.mp4"},
                    {"id": 32, "file_type": "video/webm", "width": 1080, "height": 1920, "link": "https://x/hd.webm"}
                ]
            },
            {
                "id": 4, "width": 1080, "height": 1920, "duration": 30,
                "video_files": [{"id": 40, "file_type": "video/mp4", "width": 720, "height": 1280, "link": "https://x/long.mp4"}]
            }
        ]
    }"#;

    fn videos() -> Vec<PexelsVideo> {
        serde_json::from_str::<SearchResponse>(FIXTURE).unwrap().videos
    }

    #[test]
    fn test_prefers_long_enough_clip_and_closest_file() {
        let picked = select_clip(&videos(), 5.0, &HashSet::new(), Orientation::Portrait, (1080, 1920));
        assert_eq!(picked, Some((3, "https://x/hd.mp4".to_string())));
    }

    #[test]
    fn test_skips_used_videos() {
        let used: HashSet<u64> = [3].into_iter().collect();
        let picked = select_clip(&videos(), 5.0, &used, Orientation::Portrait, (1080, 1920));
        assert_eq!(picked, Some((4, "https://x/long.mp4".to_string())));
    }

    #[test]
    fn test_falls_back_to_short_clip() {
        let used: HashSet<u64> = [3, 4].into_iter().collect();
        let picked = select_clip(&videos(), 5.0, &used, Orientation::Portrait, (1080, 1920));
        assert_eq!(picked, Some((2, "https://x/short.mp4".to_string())));
    }

    #[test]
    fn test_filters_orientation() {
        let picked = select_clip(&videos(), 5.0, &HashSet::new(), Orientation::Landscape, (1920, 1080));
        assert_eq!(picked, Some((1, "https://x/landscape.mp4".to_string())));

        assert!(select_clip(&videos(), 5.0, &HashSet::new(), Orientation::Square, (1080, 1080)).is_none());
    }

    #[test]
    fn test_empty_response() {
        let body: SearchResponse = serde_json::from_str(r#"{"page": 1}"#).unwrap();
        assert!(select_clip(&body.videos, 2.0, &HashSet::new(), Orientation::Portrait, (1080, 1920)).is_none());
    }
}
