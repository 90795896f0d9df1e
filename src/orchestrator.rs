//! Pipeline orchestrator for Reelsmith.
//!
//! Coordinates one request from topic to rendered video: script, narration,
//! word timings, captions, footage search, reconciliation and composition.

use crate::background::{
    reconcile_intervals, validate_coverage, validate_segments, BackgroundSegment, ClipResolver,
    LlmSearchTermMapper, PexelsResolver, SearchTermInterval, SearchTermMapper,
};
use crate::captions::{generate_captions, Caption};
use crate::config::{ContentType, Prompts, Settings};
use crate::error::{ReelError, Result};
use crate::render::{CompositionJob, Compositor, FfmpegCompositor, FfprobeProbe, MediaProbe};
use crate::script::{LlmScriptWriter, ScriptWriter};
use crate::speech::{OpenAiSpeech, SpeechSynthesizer};
use crate::store::{MetadataStore, NewVideoMetadata, SqliteMetadataStore, VideoMetadata};
use crate::timeline::TimeInterval;
use crate::transcription::{WhisperWordTranscriber, WordTranscriber};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A request to turn a topic into a video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    /// Narration voice; the configured default when `None`.
    pub voice: Option<String>,
    /// Narration language; the configured default when `None`.
    pub language: Option<String>,
    pub content_type: Option<ContentType>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedVideo {
    /// Request id, also the output file stem.
    pub id: String,
    pub video_path: PathBuf,
    pub topic: String,
    pub script: String,
    pub language: String,
    pub content_type: ContentType,
    pub audio_duration: f64,
    pub captions: Vec<Caption>,
    /// Reconciled background timeline; empty when no footage resolved.
    pub background: Vec<BackgroundSegment>,
}

/// Collaborators used by the orchestrator.
pub struct Components {
    pub script_writer: Arc<dyn ScriptWriter>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub probe: Arc<dyn MediaProbe>,
    pub transcriber: Arc<dyn WordTranscriber>,
    pub search_terms: Arc<dyn SearchTermMapper>,
    /// `None` when no footage provider is configured.
    pub clip_resolver: Option<Arc<dyn ClipResolver>>,
    pub compositor: Arc<dyn Compositor>,
    pub store: Arc<dyn MetadataStore>,
}

/// The main orchestrator for the Reelsmith pipeline.
pub struct Orchestrator {
    settings: Settings,
    components: Components,
    temp_dir: PathBuf,
    output_dir: PathBuf,
    request_timeout: Duration,
}

impl Orchestrator {
    /// Create a new orchestrator with the default collaborators.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let script_writer = LlmScriptWriter::with_endpoint(
            &settings.script.model,
            settings.script.api_base.as_deref(),
            settings.script.api_key.as_deref(),
        )
        .with_temperature(settings.script.temperature)
        .with_prompts(prompts.clone());

        let search_terms = LlmSearchTermMapper::with_endpoint(
            &settings.search_terms.model,
            settings.search_terms.max_terms,
            settings.script.api_base.as_deref(),
            settings.script.api_key.as_deref(),
        )
        .with_prompts(prompts);

        let clip_resolver: Option<Arc<dyn ClipResolver>> = match settings.pexels_api_key() {
            Some(key) => Some(Arc::new(
                PexelsResolver::new(key, settings.footage.orientation)?
                    .with_per_page(settings.footage.per_page)
                    .with_target_size(settings.render.width, settings.render.height),
            )),
            None => {
                warn!("No Pexels API key configured, videos will have no background footage");
                None
            }
        };

        let compositor = FfmpegCompositor::new(settings.render.clone(), settings.temp_dir())?
            .with_max_concurrent_downloads(settings.footage.max_concurrent_downloads);

        let store = SqliteMetadataStore::new(&settings.sqlite_path())?;

        let components = Components {
            script_writer: Arc::new(script_writer),
            speech: Arc::new(OpenAiSpeech::new(&settings.speech.model, &settings.speech.default_voice)),
            probe: Arc::new(FfprobeProbe),
            transcriber: Arc::new(WhisperWordTranscriber::with_model(&settings.transcription.model)),
            search_terms: Arc::new(search_terms),
            clip_resolver,
            compositor: Arc::new(compositor),
            store: Arc::new(store),
        };

        Self::with_components(settings, components)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(settings: Settings, components: Components) -> Result<Self> {
        let temp_dir = settings.temp_dir();
        let output_dir = settings.output_dir();
        std::fs::create_dir_all(&temp_dir)?;
        std::fs::create_dir_all(&output_dir)?;

        let request_timeout = Duration::from_secs(settings.general.request_timeout_secs.max(1));

        Ok(Self {
            settings,
            components,
            temp_dir,
            output_dir,
            request_timeout,
        })
    }

    /// Override the per-request time limit.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Directory finished videos are written to.
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Get a reference to the metadata store.
    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.components.store.clone()
    }

    /// Generate a video, giving up after the configured request timeout.
    #[instrument(skip(self, request), fields(topic = %request.topic))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedVideo> {
        if request.topic.trim().is_empty() {
            return Err(ReelError::InvalidInput("Topic must not be empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let work_dir = self.temp_dir.join(&id);
        tokio::fs::create_dir_all(&work_dir).await?;

        let result = tokio::time::timeout(self.request_timeout, self.run(&id, &work_dir, request)).await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            debug!("Could not remove {}: {}", work_dir.display(), e);
        }

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(ReelError::Timeout(self.request_timeout.as_secs())),
        }
    }

    /// Generate a video and record its metadata.
    pub async fn generate_and_store(
        &self,
        request: &GenerationRequest,
    ) -> Result<(GeneratedVideo, VideoMetadata)> {
        let video = self.generate(request).await?;
        let metadata = self.record(&video).await?;
        Ok((video, metadata))
    }

    /// Store metadata for a generated video.
    pub async fn record(&self, video: &GeneratedVideo) -> Result<VideoMetadata> {
        let metadata = NewVideoMetadata::generated(
            &video.topic,
            &video.video_path.to_string_lossy(),
            video.content_type,
            &video.language,
            self.settings.database.default_tags.clone(),
        )
        .with_script(&video.script);

        self.components.store.insert(&metadata).await
    }

    async fn run(&self, id: &str, work_dir: &std::path::Path, request: &GenerationRequest) -> Result<GeneratedVideo> {
        let topic = request.topic.trim();
        let language = request
            .language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.settings.script.default_language.clone());
        let content_type = request
            .content_type
            .unwrap_or(self.settings.script.default_content_type);
        let voice = request
            .voice
            .clone()
            .unwrap_or_else(|| self.settings.speech.default_voice.clone());

        info!("Generating {} video about '{}' in {}", content_type, topic, language);

        let script = self
            .components
            .script_writer
            .write_script(topic, &language, content_type)
            .await?;

        let audio_path = work_dir.join("narration.mp3");
        self.components
            .speech
            .synthesize(&script, &voice, &audio_path)
            .await?;

        let audio_duration = self.components.probe.duration(&audio_path).await?;
        if !(audio_duration.is_finite() && audio_duration > 0.0) {
            return Err(ReelError::Speech(format!(
                "narration has no usable length ({})",
                audio_duration
            )));
        }
        debug!("Narration is {:.2}s", audio_duration);

        let words = self
            .components
            .transcriber
            .transcribe_words(&audio_path, self.settings.transcription.language.as_deref())
            .await?;
        let captions = generate_captions(&words, &self.settings.captions)?;
        info!("{} words -> {} captions", words.len(), captions.len());

        let terms = self
            .components
            .search_terms
            .map(&script, &captions, audio_duration)
            .await?;
        self.check_coverage(&terms, audio_duration)?;

        let segments = self.resolve(&terms).await?;
        let background = reconcile_intervals(segments);
        if background.is_empty() {
            warn!("No background footage resolved");
        } else if let Err(e) = validate_segments(
            &background,
            Some(audio_duration),
            self.settings.footage.interval_tolerance_seconds.max(0.0),
        ) {
            warn!("Background timeline does not tile the narration: {}", e);
        }

        let job = CompositionJob {
            id: id.to_string(),
            audio_path,
            audio_duration,
            captions: captions.clone(),
            background: background.clone(),
            output_path: self.output_dir.join(format!("{}.mp4", id)),
        };
        let video_path = self.components.compositor.compose(job).await?;

        Ok(GeneratedVideo {
            id: id.to_string(),
            video_path,
            topic: topic.to_string(),
            script,
            language,
            content_type,
            audio_duration,
            captions,
            background,
        })
    }

    /// Validate search-term intervals at the mapping boundary.
    fn check_coverage(&self, terms: &[SearchTermInterval], audio_duration: f64) -> Result<()> {
        let intervals: Vec<TimeInterval> = terms.iter().map(|t| t.interval).collect();
        let tolerance = self.settings.footage.interval_tolerance_seconds.max(0.0);

        match validate_coverage(&intervals, Some(audio_duration), tolerance) {
            Ok(()) => Ok(()),
            Err(e) if self.settings.footage.strict_intervals => Err(e),
            Err(e) => {
                warn!("Search term intervals need repair: {}", e);
                Ok(())
            }
        }
    }

    async fn resolve(&self, terms: &[SearchTermInterval]) -> Result<Vec<BackgroundSegment>> {
        let Some(resolver) = &self.components.clip_resolver else {
            return Ok(terms.iter().map(|t| BackgroundSegment::absent(t.interval)).collect());
        };

        let segments = resolver.resolve(terms).await?;
        if segments.len() != terms.len() {
            return Err(ReelError::ClipResolution(format!(
                "resolver returned {} segments for {} intervals",
                segments.len(),
                terms.len()
            )));
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::Word;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct FakeScript {
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ScriptWriter for FakeScript {
        async fn write_script(&self, topic: &str, _language: &str, _content_type: ContentType) -> Result<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(format!("Breaking news about {}", topic))
        }
    }

    struct FakeSpeech;

    #[async_trait]
    impl SpeechSynthesizer for FakeSpeech {
        async fn synthesize(&self, _text: &str, _voice: &str, output_path: &Path) -> Result<()> {
            tokio::fs::write(output_path, b"ID3").await?;
            Ok(())
        }
    }

    struct FakeProbe(f64);

    #[async_trait]
    impl MediaProbe for FakeProbe {
        async fn duration(&self, _path: &Path) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FakeTranscriber;

    #[async_trait]
    impl WordTranscriber for FakeTranscriber {
        async fn transcribe_words(&self, _audio_path: &Path, _language: Option<&str>) -> Result<Vec<Word>> {
            Ok(vec![
                Word::new("Breaking", 0.0, 800.0),
                Word::new("news", 900.0, 1400.0),
                Word::new("about", 1500.0, 2100.0),
                Word::new("volcanoes!", 2200.0, 3000.0),
            ])
        }
    }

    struct FakeMapper(Vec<SearchTermInterval>);

    #[async_trait]
    impl SearchTermMapper for FakeMapper {
        async fn map(&self, _script: &str, _captions: &[Caption], _audio_duration: f64) -> Result<Vec<SearchTermInterval>> {
            Ok(self.0.clone())
        }
    }

    /// Resolves a term to `https://clips/<term>.mp4` unless it is "missing".
    struct FakeResolver;

    #[async_trait]
    impl ClipResolver for FakeResolver {
        async fn resolve(&self, terms: &[SearchTermInterval]) -> Result<Vec<BackgroundSegment>> {
            Ok(terms
                .iter()
                .map(|t| match t.terms.first().map(String::as_str) {
                    Some("missing") | None => BackgroundSegment::absent(t.interval),
                    Some(term) => BackgroundSegment::resolved(t.interval, format!("https://clips/{}.mp4", term)),
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeCompositor {
        jobs: Mutex<Vec<CompositionJob>>,
    }

    #[async_trait]
    impl Compositor for FakeCompositor {
        async fn compose(&self, job: CompositionJob) -> Result<PathBuf> {
            if job.background.is_empty() {
                return Err(ReelError::NoBackgroundVideo);
            }
            let path = job.output_path.clone();
            self.jobs.lock().unwrap().push(job);
            Ok(path)
        }
    }

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.temp_dir = dir.join("tmp").to_string_lossy().to_string();
        settings.general.output_dir = dir.join("videos").to_string_lossy().to_string();
        settings
    }

    fn orchestrator(
        settings: Settings,
        terms: Vec<SearchTermInterval>,
        compositor: Arc<FakeCompositor>,
        delay: Option<Duration>,
    ) -> Orchestrator {
        let components = Components {
            script_writer: Arc::new(FakeScript { delay }),
            speech: Arc::new(FakeSpeech),
            probe: Arc::new(FakeProbe(3.2)),
            transcriber: Arc::new(FakeTranscriber),
            search_terms: Arc::new(FakeMapper(terms)),
            clip_resolver: Some(Arc::new(FakeResolver)),
            compositor,
            store: Arc::new(SqliteMetadataStore::in_memory().unwrap()),
        };
        Orchestrator::with_components(settings, components).unwrap()
    }

    fn term(start: f64, end: f64, t: &str) -> SearchTermInterval {
        SearchTermInterval::new(start, end, vec![t.to_string()])
    }

    #[tokio::test]
    async fn test_generate_reconciles_background() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = Arc::new(FakeCompositor::default());
        let orchestrator = orchestrator(
            settings(dir.path()),
            vec![term(0.0, 1.0, "missing"), term(1.0, 2.2, "lava"), term(2.2, 3.2, "missing")],
            compositor.clone(),
            None,
        );

        let video = orchestrator
            .generate(&GenerationRequest::new("volcanoes"))
            .await
            .unwrap();

        assert_eq!(video.script, "Breaking news about volcanoes");
        assert_eq!(video.language, "Hindi");
        assert_eq!(video.content_type, ContentType::News);
        assert_eq!(video.captions.len(), 2);
        assert_eq!(video.captions[0].text, "Breaking news about");
        assert_eq!(video.captions[1].text, "volcanoes");
        assert_eq!(
            video.background,
            vec![BackgroundSegment::resolved(TimeInterval::new(0.0, 3.2), "https://clips/lava.mp4")]
        );
        assert!(video.video_path.ends_with(format!("{}.mp4", video.id)));

        let jobs = compositor.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].audio_duration, 3.2);

        // Working files are removed once the request finishes.
        assert!(!orchestrator.temp_dir.join(&video.id).exists());
    }

    #[tokio::test]
    async fn test_generate_repairs_gappy_terms_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(
            settings(dir.path()),
            vec![term(0.0, 1.0, "ash"), term(2.0, 3.2, "lava")],
            Arc::new(FakeCompositor::default()),
            None,
        );

        let video = orchestrator.generate(&GenerationRequest::new("volcanoes")).await.unwrap();
        assert_eq!(video.background.len(), 2);
        assert_eq!(video.background[0].interval.end, video.background[1].interval.start);
    }

    #[tokio::test]
    async fn test_generate_strict_intervals_rejects_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.footage.strict_intervals = true;
        let orchestrator = orchestrator(
            settings,
            vec![term(0.0, 1.0, "ash"), term(2.0, 3.2, "lava")],
            Arc::new(FakeCompositor::default()),
            None,
        );

        let err = orchestrator.generate(&GenerationRequest::new("volcanoes")).await.unwrap_err();
        assert!(matches!(err, ReelError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_generate_total_resolution_failure_reaches_compositor() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = Arc::new(FakeCompositor::default());
        let orchestrator = orchestrator(
            settings(dir.path()),
            vec![term(0.0, 3.2, "missing")],
            compositor.clone(),
            None,
        );

        let err = orchestrator.generate(&GenerationRequest::new("volcanoes")).await.unwrap_err();
        assert!(matches!(err, ReelError::NoBackgroundVideo));
        assert!(compositor.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(
            settings(dir.path()),
            vec![term(0.0, 3.2, "lava")],
            Arc::new(FakeCompositor::default()),
            Some(Duration::from_secs(5)),
        )
        .with_request_timeout(Duration::from_millis(50));

        let err = orchestrator.generate(&GenerationRequest::new("volcanoes")).await.unwrap_err();
        assert!(matches!(err, ReelError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_topic() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(settings(dir.path()), Vec::new(), Arc::new(FakeCompositor::default()), None);

        let err = orchestrator.generate(&GenerationRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, ReelError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_generate_and_store_records_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(
            settings(dir.path()),
            vec![term(0.0, 3.2, "lava")],
            Arc::new(FakeCompositor::default()),
            None,
        );

        let request = GenerationRequest {
            topic: "volcanoes".to_string(),
            language: Some("English".to_string()),
            content_type: Some(ContentType::InterestingFacts),
            voice: None,
        };
        let (video, metadata) = orchestrator.generate_and_store(&request).await.unwrap();

        assert_eq!(metadata.topic, "volcanoes");
        assert_eq!(metadata.language, "English");
        assert_eq!(metadata.content_type, ContentType::InterestingFacts);
        assert_eq!(metadata.video_path, video.video_path.to_string_lossy());
        assert_eq!(metadata.tags, orchestrator.settings().database.default_tags);

        let listed = orchestrator.store().list(None).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
