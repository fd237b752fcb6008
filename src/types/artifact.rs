//! AudioArtifact type and deterministic artifact naming.
//!
//! An AudioArtifact is a named audio file on durable storage, either the
//! music track or the voice-over. Default music filenames are derived from a
//! hash of the generation parameters, so identical requests land on the same
//! file (last write wins).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// What an artifact contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Generated music track (WAV).
    Music,
    /// Synthesized voice-over (MP3).
    Voice,
}

impl ArtifactKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Music => "music",
            ArtifactKind::Voice => "voice",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A produced audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioArtifact {
    /// Full filesystem path to the file.
    pub path: PathBuf,

    /// Whether this is the music track or the voice-over.
    pub kind: ArtifactKind,

    /// Sample rate in Hz, when known (always known for music output).
    pub sample_rate: Option<u32>,

    /// Duration in seconds, when known.
    pub duration_sec: Option<f32>,
}

impl AudioArtifact {
    /// Creates a music artifact.
    pub fn music(path: PathBuf, sample_rate: u32, duration_sec: f32) -> Self {
        Self {
            path,
            kind: ArtifactKind::Music,
            sample_rate: Some(sample_rate),
            duration_sec: Some(duration_sec),
        }
    }

    /// Creates a voice artifact. The speech container carries its own rate.
    pub fn voice(path: PathBuf) -> Self {
        Self {
            path,
            kind: ArtifactKind::Voice,
            sample_rate: None,
            duration_sec: None,
        }
    }
}

/// Computes a deterministic artifact ID from generation parameters.
///
/// The ID is the first 16 hex characters of the SHA-256 hash of
/// `{prompt}:{seed}:{duration_sec}:{model_version}`. Identical parameters
/// always produce the same ID, so re-running a request overwrites its own
/// previous output rather than accumulating files.
pub fn compute_artifact_id(
    prompt: &str,
    seed: u64,
    duration_sec: u32,
    model_version: &str,
) -> String {
    let input = format!("{}:{}:{}:{}", prompt, seed, duration_sec, model_version);
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
