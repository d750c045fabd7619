//! Backend-agnostic speech synthesis over a chunk sequence.
//!
//! A [`SpeechBackend`] performs exactly one remote call per `speak`. The
//! [`Synthesizer`] layers two things on top: an ordered attempt policy over
//! [`RequestShape`]s (the encoding parameter has two accepted spellings
//! across API versions) and the sequential fold that concatenates the audio
//! of every chunk in order.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use tracing::{debug, warn};

use crate::voice::Voice;

/// Encoding requested from the speech endpoint. MP3 frames are self-framing,
/// so independently encoded segments can be concatenated byte-wise.
pub const AUDIO_ENCODING: &str = "mp3";

/// Spelling of the parameter that carries [`AUDIO_ENCODING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestShape {
    /// `"response_format": "mp3"`
    ResponseFormat,
    /// `"format": "mp3"`
    Format,
}

impl RequestShape {
    pub fn field_name(&self) -> &'static str {
        match self {
            RequestShape::ResponseFormat => "response_format",
            RequestShape::Format => "format",
        }
    }
}

/// Attempt order used by [`Synthesizer::new`].
pub const DEFAULT_SHAPES: [RequestShape; 2] = [RequestShape::ResponseFormat, RequestShape::Format];

/// One synthesis call: a single chunk with its voice and model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub model: String,
    pub voice: Voice,
    pub input: String,
}

impl SpeechRequest {
    pub fn new(model: impl Into<String>, voice: Voice, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            voice,
            input: input.into(),
        }
    }

    pub fn encoding(&self) -> &'static str {
        AUDIO_ENCODING
    }
}

pub type ByteStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Audio returned by a backend, either already buffered or as a body stream.
pub enum SpeechPayload {
    Bytes(Vec<u8>),
    Stream(ByteStream),
}

impl SpeechPayload {
    /// Drain the payload into a plain byte vector.
    pub async fn into_bytes(self) -> Result<Vec<u8>, BackendError> {
        match self {
            SpeechPayload::Bytes(bytes) => Ok(bytes),
            SpeechPayload::Stream(mut stream) => {
                let mut out = Vec::new();
                while let Some(part) = stream.next().await {
                    out.extend_from_slice(&part?);
                }
                Ok(out)
            }
        }
    }
}

impl fmt::Debug for SpeechPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechPayload::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            SpeechPayload::Stream(_) => f.write_str("Stream(<body>)"),
        }
    }
}

/// Failure of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The endpoint refused the spelling of the encoding parameter.
    #[error("request rejected for parameter '{field}': {message}")]
    ShapeRejected { field: &'static str, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("speech API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_shape_rejection(&self) -> bool {
        matches!(self, BackendError::ShapeRejected { .. })
    }
}

/// A remote text-to-speech endpoint.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Issue one synthesis call using the given request shape.
    async fn speak(
        &self,
        request: &SpeechRequest,
        shape: RequestShape,
    ) -> Result<SpeechPayload, BackendError>;
}

/// Synthesis failed on one chunk of a sequence.
#[derive(Debug, thiserror::Error)]
#[error("synthesis failed on chunk {} of {}: {}", .chunk + 1, .total, .source)]
pub struct SynthesisError {
    /// Zero-based index of the failing chunk
    pub chunk: usize,
    pub total: usize,
    #[source]
    pub source: BackendError,
}

#[derive(Clone)]
pub struct Synthesizer {
    backend: Arc<dyn SpeechBackend>,
    shapes: Vec<RequestShape>,
}

impl fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesizer")
            .field("backend", &"<SpeechBackend>")
            .field("shapes", &self.shapes)
            .finish()
    }
}

impl Synthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self {
            backend,
            shapes: DEFAULT_SHAPES.to_vec(),
        }
    }

    /// Override the attempt order. An empty list keeps the default order.
    pub fn with_shapes(mut self, shapes: Vec<RequestShape>) -> Self {
        if !shapes.is_empty() {
            self.shapes = shapes;
        }
        self
    }

    pub fn shapes(&self) -> &[RequestShape] {
        &self.shapes
    }

    /// Synthesize a single chunk.
    ///
    /// Shapes are tried in order; only a shape rejection moves on to the next
    /// one. Any other error is returned immediately. If every shape is
    /// rejected the last rejection is returned.
    pub async fn synthesize_one(
        &self,
        model: &str,
        voice: Voice,
        text: &str,
    ) -> Result<Vec<u8>, BackendError> {
        let request = SpeechRequest::new(model, voice, text);
        let mut last_rejection = None;

        for &shape in &self.shapes {
            match self.backend.speak(&request, shape).await {
                Ok(payload) => return payload.into_bytes().await,
                Err(e) if e.is_shape_rejection() => {
                    warn!(
                        "Speech endpoint rejected '{}', trying next request shape: {e}",
                        shape.field_name()
                    );
                    last_rejection = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_rejection.unwrap_or_else(|| BackendError::ShapeRejected {
            field: "",
            message: "no request shapes configured".to_string(),
        }))
    }

    /// Synthesize every chunk in order and concatenate the audio.
    pub async fn synthesize<S: AsRef<str>>(
        &self,
        chunks: &[S],
        voice: Voice,
        model: &str,
    ) -> Result<Vec<u8>, SynthesisError> {
        let total = chunks.len();
        let mut out = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let audio = self
                .synthesize_one(model, voice, chunk.as_ref())
                .await
                .map_err(|source| SynthesisError {
                    chunk: i,
                    total,
                    source,
                })?;
            debug!("chunk {}/{}: {} bytes", i + 1, total, audio.len());
            out.extend_from_slice(&audio);
        }

        Ok(out)
    }
}
