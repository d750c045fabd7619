use std::{io, time::Instant};

use tracing::{error, info};

use crate::{
    chunker::chunk_text,
    store::{Artifact, ArtifactStore},
    synth::{SynthesisError, Synthesizer},
    voice::Voice,
};

/// Outcome of one successful generate run.
#[derive(Debug, Clone)]
pub struct Generation {
    pub artifact: Artifact,
    pub chunks: usize,
    pub audio: Vec<u8>,
    pub elapsed_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The endpoint answered every call but produced no audio at all.
    #[error("No audio was returned for {chunks} chunk(s)")]
    NoAudio { chunks: usize },

    #[error("Failed to write audio file: {0}")]
    Persist(#[from] io::Error),
}

/// Chunk -> synthesize -> persist pipeline.
#[derive(Debug, Clone)]
pub struct TtsManager {
    synthesizer: Synthesizer,
    store: ArtifactStore,
    max_chars: usize,
}

impl TtsManager {
    pub fn new(synthesizer: Synthesizer, store: ArtifactStore, max_chars: usize) -> Self {
        Self {
            synthesizer,
            store,
            max_chars,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn chunks_for(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.max_chars)
    }

    /// Run the full pipeline for one request.
    ///
    /// Nothing is written unless the synthesized buffer is non-empty.
    pub async fn generate(
        &self,
        text: &str,
        voice: Voice,
        model: &str,
    ) -> Result<Generation, GenerateError> {
        let start = Instant::now();
        let chunks = self.chunks_for(text);
        if chunks.is_empty() {
            return Err(GenerateError::EmptyInput);
        }
        info!(
            "Synthesizing {} chunk(s) with voice={} model={}",
            chunks.len(),
            voice,
            model
        );

        let audio = self.synthesizer.synthesize(&chunks, voice, model).await?;
        if audio.is_empty() {
            error!("Speech endpoint returned no audio for {} chunk(s)", chunks.len());
            return Err(GenerateError::NoAudio {
                chunks: chunks.len(),
            });
        }

        let artifact = self.store.persist(voice, &audio)?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "Generated {} ({} bytes, {} chunk(s)) in {}ms",
            artifact.file_name,
            audio.len(),
            chunks.len(),
            elapsed_ms
        );

        Ok(Generation {
            artifact,
            chunks: chunks.len(),
            audio,
            elapsed_ms,
        })
    }
}
