use tts_core::{is_artifact_name, Voice};

use crate::error::ApiError;

/// Maximum text length (in characters) accepted for one generate request
const MAX_TEXT_LENGTH: usize = 200_000;
/// Maximum model identifier length
const MAX_MODEL_LENGTH: usize = 128;

/// Validate text for a generate request. Whitespace-only text counts as empty.
pub fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(())
}

/// Parse the requested voice; a missing or blank value selects the default.
pub fn parse_voice(voice: Option<&str>) -> Result<Voice, ApiError> {
    match voice.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(Voice::default()),
        Some(v) => v.parse().map_err(|_| {
            ApiError::InvalidInput(format!(
                "Unknown voice '{}'. Available voices: {}",
                v,
                Voice::names().join(", ")
            ))
        }),
    }
}

/// Resolve the model name; a missing or blank value selects `default`.
pub fn resolve_model(model: Option<&str>, default: &str) -> Result<String, ApiError> {
    let model = match model.map(str::trim).filter(|m| !m.is_empty()) {
        None => return Ok(default.to_string()),
        Some(m) => m,
    };
    if model.len() > MAX_MODEL_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Model name too long (max {} characters)",
            MAX_MODEL_LENGTH
        )));
    }
    if model.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ApiError::InvalidInput(format!(
            "Invalid model name: {}",
            model
        )));
    }
    Ok(model.to_string())
}

/// Uploaded files must be plain-text files.
pub fn validate_upload_name(file_name: Option<&str>) -> Result<(), ApiError> {
    match file_name {
        Some(name) if !name.to_ascii_lowercase().ends_with(".txt") => Err(ApiError::InvalidInput(
            format!("Only .txt files can be uploaded (got {})", name),
        )),
        _ => Ok(()),
    }
}

/// Validate a requested artifact name before touching the filesystem
pub fn validate_artifact_name(file_name: &str) -> Result<(), ApiError> {
    if is_artifact_name(file_name) {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "Invalid audio file name: {}",
            file_name
        )))
    }
}
