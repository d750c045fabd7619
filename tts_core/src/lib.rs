//! Chunked text-to-speech pipeline.
//!
//! Text is packed into whitespace-bounded chunks ([`chunker`]), each chunk is
//! sent to a [`SpeechBackend`] by the [`Synthesizer`], and the concatenated
//! MP3 audio is written to an [`ArtifactStore`]. [`TtsManager`] ties the
//! three together.

pub mod chunker;
pub mod inline;
mod manager;
pub mod store;
pub mod synth;
mod voice;

pub use chunker::{chunk_text, DEFAULT_MAX_CHARS};
pub use inline::{audio_data_url, encode_audio_base64, MP3_MIME};
pub use manager::{GenerateError, Generation, TtsManager};
pub use store::{is_artifact_name, Artifact, ArtifactStore};
pub use synth::{
    BackendError, ByteStream, RequestShape, SpeechBackend, SpeechPayload, SpeechRequest,
    SynthesisError, Synthesizer, AUDIO_ENCODING, DEFAULT_SHAPES,
};
pub use voice::{UnknownVoice, Voice};

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-tts";
