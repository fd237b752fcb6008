//! Request types for pipeline runs and engine generation.
//!
//! A TrackRequest describes one full pipeline invocation. A GenerationRequest
//! is the immutable engine-level request: all generation parameters travel in
//! the request itself, so an engine handle carries no per-call mutable state.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// One pipeline invocation: what to generate and which optional branches run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRequest {
    /// User intent or full music description.
    pub intent: String,

    /// Duration of audio to generate in seconds.
    pub duration_sec: u32,

    /// Whether to expand the intent into a richer prompt before generation.
    /// When false the intent is used as the generation prompt verbatim.
    pub expand: bool,

    /// Optional voice-over text. When present, a speech artifact is
    /// synthesized alongside the music track.
    pub voice_text: Option<String>,

    /// Random seed for reproducible sampling. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl TrackRequest {
    /// Creates a request with no expansion, voice-over, or seed.
    pub fn new(intent: impl Into<String>, duration_sec: u32) -> Self {
        Self {
            intent: intent.into(),
            duration_sec,
            expand: false,
            voice_text: None,
            seed: None,
        }
    }

    /// Enables prompt expansion.
    pub fn with_expansion(mut self) -> Self {
        self.expand = true;
        self
    }

    /// Attaches voice-over text.
    pub fn with_voice_text(mut self, text: impl Into<String>) -> Self {
        self.voice_text = Some(text.into());
        self
    }

    /// Pins the sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Immutable engine-level generation request.
///
/// Passed whole into `Engine::generate`; the engine never holds generation
/// parameters between calls, so concurrent runs each owning their own engine
/// cannot observe each other's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Text description of the music to generate.
    pub prompt: String,

    /// Duration of audio to generate in seconds.
    pub duration_sec: u32,

    /// Random seed for reproducible sampling. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    /// Creates a generation request.
    pub fn new(prompt: impl Into<String>, duration_sec: u32) -> Self {
        Self {
            prompt: prompt.into(),
            duration_sec,
            seed: None,
        }
    }

    /// Pins the sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the request against the given duration ceiling.
    ///
    /// Rejects zero duration, duration above `max_duration_sec`, empty
    /// prompts, and prompts over [`MAX_PROMPT_CHARS`] characters.
    pub fn validate(&self, max_duration_sec: u32) -> Result<()> {
        if self.duration_sec == 0 || self.duration_sec > max_duration_sec {
            return Err(PipelineError::invalid_duration(
                self.duration_sec,
                max_duration_sec,
            ));
        }

        if self.prompt.trim().is_empty() {
            return Err(PipelineError::empty_prompt());
        }

        if self.prompt.len() > MAX_PROMPT_CHARS {
            return Err(PipelineError::prompt_too_long(self.prompt.len()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn track_request_builders() {
        let req = TrackRequest::new("cyberpunk chase", 8)
            .with_expansion()
            .with_voice_text("Buckle up.")
            .with_seed(42);
        assert!(req.expand);
        assert_eq!(req.voice_text.as_deref(), Some("Buckle up."));
        assert_eq!(req.seed, Some(42));
    }

    #[test]
    fn validate_accepts_positive_durations() {
        for duration in [1, 10, 120] {
            let req = GenerationRequest::new("lofi beats", duration);
            assert!(req.validate(120).is_ok(), "duration {} rejected", duration);
        }
    }

    #[test]
    fn validate_rejects_zero_duration() {
        let req = GenerationRequest::new("lofi beats", 0);
        let err = req.validate(120).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDuration);
    }

    #[test]
    fn validate_rejects_duration_above_ceiling() {
        let req = GenerationRequest::new("lofi beats", 121);
        let err = req.validate(120).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDuration);
    }

    #[test]
    fn validate_rejects_empty_prompt() {
        let req = GenerationRequest::new("   ", 10);
        let err = req.validate(120).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);
    }

    #[test]
    fn validate_rejects_oversized_prompt() {
        let req = GenerationRequest::new("x".repeat(MAX_PROMPT_CHARS + 1), 10);
        let err = req.validate(120).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);
    }
}
