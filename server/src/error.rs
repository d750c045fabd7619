use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tts_core::GenerateError;

/// Shown when every call succeeded but no audio came back.
pub const NO_AUDIO_HINT: &str =
    "No audio was generated. Check your API key, the model name and the server logs.";

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing credential; nothing can be synthesized until it is fixed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("TTS error: {0}")]
    Synthesis(String),

    #[error("No audio was generated")]
    NoAudio,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Synthesis(_) | ApiError::NoAudio => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        match e {
            GenerateError::EmptyInput => ApiError::InvalidInput("Text cannot be empty".to_string()),
            GenerateError::Synthesis(e) => ApiError::Synthesis(e.to_string()),
            GenerateError::NoAudio { .. } => ApiError::NoAudio,
            GenerateError::Persist(e) => ApiError::InternalError(format!("Failed to save audio: {e}")),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::InvalidInput(msg) | ApiError::NotFound(msg) => msg,
            ApiError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                msg
            }
            ApiError::Synthesis(msg) => {
                tracing::error!("TTS error: {}", msg);
                format!("TTS error: {}", msg)
            }
            ApiError::NoAudio => {
                tracing::error!("Synthesis produced no audio");
                NO_AUDIO_HINT.to_string()
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                msg
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
