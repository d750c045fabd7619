// Configuration for the server, read from the environment

use std::{path::PathBuf, str::FromStr, time::Duration};

use openai_core::{DEFAULT_BASE_URL, DEFAULT_SECRETS_PATH};
use tts_core::{DEFAULT_MAX_CHARS, DEFAULT_MODEL};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub output_dir: PathBuf,
    pub max_chars_per_chunk: usize,
    pub default_model: String,
    pub openai_base_url: String,
    pub secrets_path: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            // one call per chunk, sequentially; long inputs take a while
            request_timeout_secs: 300,
            cors_allowed_origins: None,
            output_dir: PathBuf::from("tts_outputs"),
            max_chars_per_chunk: DEFAULT_MAX_CHARS,
            default_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let request_timeout_secs =
            env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout_secs);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        let output_dir = env_string("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let max_chars_per_chunk = env_parse::<usize>("MAX_CHARS_PER_CHUNK")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_chars_per_chunk);

        let default_model = env_string("DEFAULT_MODEL").unwrap_or(defaults.default_model);

        let openai_base_url = env_string("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url);

        let secrets_path = env_string("SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.secrets_path);

        let max_upload_bytes = env_parse("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes);

        Self {
            port,
            request_timeout_secs,
            cors_allowed_origins,
            output_dir,
            max_chars_per_chunk,
            default_model,
            openai_base_url,
            secrets_path,
            max_upload_bytes,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
