//! Output directory holding generated MP3 artifacts.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::voice::Voice;

const ARTIFACT_EXTENSION: &str = "mp3";
const NAME_ATTEMPTS: usize = 8;

/// A persisted audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))
    }

    /// `<voice>-<8 hex>.mp3`
    pub fn artifact_name(voice: Voice) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}.{}", voice, &id[..8], ARTIFACT_EXTENSION)
    }

    /// Write `audio` under a fresh name. Existing files are never replaced.
    pub fn persist(&self, voice: Voice, audio: &[u8]) -> io::Result<Artifact> {
        for _ in 0..NAME_ATTEMPTS {
            let file_name = Self::artifact_name(voice);
            let path = self.dir.join(&file_name);
            match self.write_new(&path, audio) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
            info!("Wrote {} ({} bytes)", path.display(), audio.len());
            return Ok(Artifact {
                file_name,
                path,
                size: audio.len(),
            });
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find a free artifact name",
        ))
    }

    /// Stage `audio` in a temporary file inside the store and link it to
    /// `path` only once fully written. On any error the staged file is
    /// removed and `path` is left untouched.
    fn write_new(&self, path: &Path, audio: &[u8]) -> io::Result<()> {
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(audio)?;
        staged.as_file().sync_all()?;
        staged.persist_noclobber(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Resolve a stored artifact by name. Returns `None` for names that are
    /// not artifact names or files that do not exist.
    pub fn locate(&self, file_name: &str) -> Option<PathBuf> {
        if !is_artifact_name(file_name) {
            return None;
        }
        let path = self.dir.join(file_name);
        path.is_file().then_some(path)
    }

}

/// Plain file name with the artifact extension and no path components.
pub fn is_artifact_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".mp3") else {
        return false;
    };
    !stem.is_empty()
        && !stem.starts_with('.')
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
