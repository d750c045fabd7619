use std::{fmt, fs, io, path::Path};

/// Name of the credential, both as environment variable and secrets key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Default location of the secrets file.
pub const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    SecretsFile,
}

/// API key with a redacted `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    source: KeySource,
}

impl ApiKey {
    pub fn new(value: impl Into<String>, source: KeySource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> KeySource {
        self.source
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Missing OPENAI_API_KEY: set it in the environment or in {0}")]
    Missing(String),

    #[error("Failed to read secrets file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Secrets file {path} is not valid TOML: {message}")]
    Malformed { path: String, message: String },
}

/// Resolve the API key from the process environment first, then from the
/// secrets file.
pub fn resolve_api_key(secrets_path: &Path) -> Result<ApiKey, CredentialError> {
    resolve_from(std::env::var(API_KEY_VAR).ok(), secrets_path)
}

/// Resolution with the environment value passed in. Blank values count as
/// missing. A secrets file that does not exist is not an error by itself.
pub fn resolve_from(env_value: Option<String>, secrets_path: &Path) -> Result<ApiKey, CredentialError> {
    if let Some(value) = env_value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        return Ok(ApiKey::new(value, KeySource::Environment));
    }

    let path_display = secrets_path.display().to_string();
    let text = match fs::read_to_string(secrets_path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CredentialError::Missing(path_display));
        }
        Err(source) => {
            return Err(CredentialError::Unreadable {
                path: path_display,
                source,
            })
        }
    };

    let table: toml::Table = text.parse().map_err(|e: toml::de::Error| CredentialError::Malformed {
        path: path_display.clone(),
        message: e.message().to_string(),
    })?;

    table
        .get(API_KEY_VAR)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| ApiKey::new(v, KeySource::SecretsFile))
        .ok_or(CredentialError::Missing(path_display))
}
