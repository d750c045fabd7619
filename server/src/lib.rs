pub mod config;
pub mod error;
pub mod metrics;
pub mod validation;

use std::{sync::atomic::Ordering, sync::Arc, time::Instant};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tts_core::{audio_data_url, ArtifactStore, Generation, TtsManager, Voice, MP3_MIME};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::metrics::{AppMetrics, MetricsResponse};
use crate::validation::{
    parse_voice, resolve_model, validate_artifact_name, validate_text, validate_upload_name,
};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    /// `None` until a credential is configured
    pub tts: Option<Arc<TtsManager>>,
    pub config_error: Option<String>,
    pub store: ArtifactStore,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
}

impl AppState {
    pub fn ready(config: ServerConfig, tts: TtsManager) -> Self {
        Self {
            store: tts.store().clone(),
            tts: Some(Arc::new(tts)),
            config_error: None,
            metrics: AppMetrics::new(),
            config,
        }
    }

    /// State for a server that is up but cannot synthesize.
    pub fn unconfigured(config: ServerConfig, store: ArtifactStore, reason: impl Into<String>) -> Self {
        Self {
            tts: None,
            config_error: Some(reason.into()),
            store,
            metrics: AppMetrics::new(),
            config,
        }
    }

    fn manager(&self) -> Result<&TtsManager, ApiError> {
        self.tts.as_deref().ok_or_else(|| {
            ApiError::Configuration(
                self.config_error
                    .clone()
                    .unwrap_or_else(|| "Speech synthesis is not configured".to_string()),
            )
        })
    }
}

#[derive(Deserialize)]
pub struct TtsRequest {
    pub text: String,
    pub voice: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TtsResponse {
    pub file_name: String,
    pub audio_url: String,
    pub download_url: String,
    /// Inline copy of the audio for players that cannot load `audio_url`
    pub fallback_audio_url: String,
    pub voice: Voice,
    pub model: String,
    pub chunks: usize,
    pub bytes: usize,
    pub elapsed_ms: u64,
}

impl TtsResponse {
    fn new(generation: Generation, voice: Voice, model: String) -> Self {
        let file_name = generation.artifact.file_name;
        Self {
            audio_url: format!("/outputs/{file_name}"),
            download_url: format!("/outputs/{file_name}/download"),
            fallback_audio_url: audio_data_url(&generation.audio),
            file_name,
            voice,
            model,
            chunks: generation.chunks,
            bytes: generation.audio.len(),
            elapsed_ms: generation.elapsed_ms,
        }
    }
}

#[derive(Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<&'static str>,
    pub default_voice: Voice,
    pub default_model: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub credential_configured: bool,
    pub message: Option<String>,
    pub default_model: String,
    pub max_chars_per_chunk: usize,
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let permissive = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods.clone())
        .allow_headers(Any)
        .allow_credentials(false);

    let Some(ref allowed_origins) = config.cors_allowed_origins else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return permissive;
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        permissive
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_credentials(false)
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&request_id).ok();
    if let Some(ref v) = value {
        request.headers_mut().insert("x-request-id", v.clone());
    }
    let mut response = next.run(request).await;
    if let Some(v) = value {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

/// Build the application router with all middleware applied.
pub fn build_router(state: AppState) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors_layer(&state.config))
        .into_inner();

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/status", get(status_endpoint))
        .route("/voices", get(list_voices))
        .route("/tts", post(tts_endpoint))
        .route(
            "/tts/upload",
            post(tts_upload_endpoint).layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/outputs/{file}", get(play_artifact))
        .route("/outputs/{file}/download", get(download_artifact))
        .route("/metrics", get(metrics_endpoint));

    Router::new()
        .route("/", get(index))
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn status_endpoint(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        credential_configured: state.tts.is_some(),
        message: state.config_error.clone(),
        default_model: state.config.default_model.clone(),
        max_chars_per_chunk: state.config.max_chars_per_chunk,
    })
}

pub async fn list_voices(State(state): State<AppState>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: Voice::names(),
        default_voice: Voice::default(),
        default_model: state.config.default_model.clone(),
    })
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.metrics.snapshot())
}

/// Validate, synthesize and persist; records metrics for every outcome.
async fn run_generation(
    state: &AppState,
    text: &str,
    voice: Option<&str>,
    model: Option<&str>,
) -> Result<TtsResponse, ApiError> {
    state.metrics.requests.fetch_add(1, Ordering::Relaxed);
    let start = Instant::now();

    let result = async {
        validate_text(text)?;
        let voice = parse_voice(voice)?;
        let model = resolve_model(model, &state.config.default_model)?;
        let manager = state.manager()?;

        info!(
            "Generate request: {} chars, voice={}, model={}",
            text.chars().count(),
            voice,
            model
        );
        let generation = manager.generate(text, voice, &model).await?;
        Ok::<_, ApiError>(TtsResponse::new(generation, voice, model))
    }
    .await;

    let generation_metrics = &state.metrics.generation;
    match &result {
        Ok(response) => {
            state.metrics.tts.record_request(start.elapsed().as_millis() as u64);
            generation_metrics.record_success(response.chunks, response.bytes);
        }
        Err(e) => {
            state.metrics.tts.record_error();
            match e {
                ApiError::NoAudio => generation_metrics.record_no_audio(),
                ApiError::Synthesis(_) | ApiError::InternalError(_) => generation_metrics.record_failure(),
                _ => {}
            }
        }
    }
    result
}

pub async fn tts_endpoint(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    run_generation(&state, &req.text, req.voice.as_deref(), req.model.as_deref())
        .await
        .map(Json)
}

/// Multipart form: `file` (a `.txt` file), optional `voice` and `model`.
/// Invalid UTF-8 in the file is replaced rather than rejected.
pub async fn tts_upload_endpoint(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TtsResponse>, ApiError> {
    let mut text: Option<String> = None;
    let mut voice: Option<String> = None;
    let mut model: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                validate_upload_name(field.file_name())?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("Failed to read upload: {e}")))?;
                text = Some(String::from_utf8_lossy(&data).into_owned());
            }
            "voice" | "model" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("Malformed field '{name}': {e}")))?;
                if name == "voice" {
                    voice = Some(value);
                } else {
                    model = Some(value);
                }
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| ApiError::InvalidInput("Missing 'file' field".to_string()))?;
    run_generation(&state, &text, voice.as_deref(), model.as_deref())
        .await
        .map(Json)
}

async fn read_artifact(state: &AppState, file: &str) -> Result<Vec<u8>, ApiError> {
    validate_artifact_name(file)?;
    let path = state
        .store
        .locate(file)
        .ok_or_else(|| ApiError::NotFound(format!("No audio file named {file}")))?;
    tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to read {file}: {e}")))
}

pub async fn play_artifact(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let audio = read_artifact(&state, &file).await?;
    Ok(([(header::CONTENT_TYPE, MP3_MIME)], audio).into_response())
}

pub async fn download_artifact(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let audio = read_artifact(&state, &file).await?;
    let disposition = format!("attachment; filename=\"{file}\"");
    Ok((
        [
            (header::CONTENT_TYPE, MP3_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        audio,
    )
        .into_response())
}
