//! OpenAI speech endpoint as a [`tts_core::SpeechBackend`], plus resolution
//! of the API key from the environment or a TOML secrets file.

mod client;
pub mod credentials;

pub use client::{classify_error, request_body, OpenAiSpeechClient, DEFAULT_BASE_URL};
pub use credentials::{
    resolve_api_key, resolve_from, ApiKey, CredentialError, KeySource, API_KEY_VAR,
    DEFAULT_SECRETS_PATH,
};
