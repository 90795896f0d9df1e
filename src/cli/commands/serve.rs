//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for video generation and stored metadata, and
//! serves finished videos under `/static`.

use crate::cli::Output;
use crate::config::{ContentType, Settings};
use crate::error::ReelError;
use crate::orchestrator::{GenerationRequest, Orchestrator};
use crate::store::VideoMetadata;
use axum::{
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    settings: Settings,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings.clone())?;
    let static_dir = orchestrator.output_dir().clone();

    let cors = cors_layer(settings.server.allowed_origin.as_deref())?;

    let state = Arc::new(AppState {
        orchestrator,
        settings,
    });

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/generate-video", post(generate_video))
        .route("/videos", get(list_videos))
        .route("/videos/{id}", get(get_video))
        .nest_service("/static", ServeDir::new(&static_dir))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Reelsmith API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Generate", "POST /generate-video");
    Output::kv("List Videos", "GET  /videos");
    Output::kv("Get Video", "GET  /videos/:id");
    Output::kv("Files", &format!("GET  /static -> {}", static_dir.display()));
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(allowed_origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Ok(match allowed_origin {
        Some(origin) if origin != "*" => layer.allow_origin(origin.parse::<HeaderValue>()?),
        _ => layer.allow_origin(Any),
    })
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct GenerateVideoRequest {
    /// Topic to make a video about
    text: String,
    #[serde(default)]
    voice: Option<String>,
    #[serde(default)]
    language: Option<String>,
    /// Content type name; unknown names fall back to news
    #[serde(default)]
    content: Option<String>,
}

impl GenerateVideoRequest {
    fn into_generation_request(self) -> GenerationRequest {
        GenerationRequest {
            topic: self.text,
            voice: self.voice.filter(|v| !v.trim().is_empty()),
            language: self.language.filter(|l| !l.trim().is_empty()),
            content_type: self.content.as_deref().map(ContentType::parse_or_default),
        }
    }
}

#[derive(Serialize)]
struct GenerateVideoResponse {
    video_path: String,
    video_url: String,
    metadata_id: i64,
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<VideoMetadata>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A `ReelError` rendered as an HTTP response.
struct ApiError(ReelError);

impl From<ReelError> for ApiError {
    fn from(e: ReelError) -> Self {
        Self(e)
    }
}

fn status_for(error: &ReelError) -> StatusCode {
    match error {
        ReelError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ReelError::NotFound(_) => StatusCode::NOT_FOUND,
        ReelError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ReelError::NoBackgroundVideo => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Public URL of a file in the output directory.
fn static_url(video_path: &std::path::Path) -> String {
    let name = video_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("/static/{}", name)
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn generate_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateVideoRequest>,
) -> Result<Json<GenerateVideoResponse>, ApiError> {
    let request = req.into_generation_request();
    info!(
        "Generation requested for '{}' (default language {})",
        request.topic, state.settings.script.default_language
    );

    let (video, metadata) = state.orchestrator.generate_and_store(&request).await?;

    Ok(Json(GenerateVideoResponse {
        video_path: video.video_path.display().to_string(),
        video_url: static_url(&video.video_path),
        metadata_id: metadata.id,
    }))
}

async fn list_videos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VideoListResponse>, ApiError> {
    let videos = state.orchestrator.store().list(None).await?;
    Ok(Json(VideoListResponse {
        total: videos.len(),
        videos,
    }))
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<VideoMetadata>, ApiError> {
    state
        .orchestrator
        .store()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError(ReelError::NotFound(format!("Video not found: {}", id))))
}
