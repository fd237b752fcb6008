//! Error types for trackforge.
//!
//! Defines all error codes used throughout the pipeline for consistent
//! error handling and reporting, plus the stage-tagged terminal error
//! returned by a pipeline run.

use std::fmt;

/// Error codes returned by pipeline components.
///
/// These codes appear in terminal error messages and allow callers to
/// programmatically handle specific failure conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Model weight files not found at expected path.
    /// Trigger: weights missing from the model directory.
    ModelNotFound,

    /// Failed to load model weights into memory.
    /// Trigger: corrupt file, wrong format, or OOM during load.
    ModelLoadFailed,

    /// Failed to download model weights from remote source.
    /// Trigger: network error, disk full during download.
    ModelDownloadFailed,

    /// Model inference failed during generation.
    /// Trigger: numerical instability, OOM during generation.
    GenerationFailed,

    /// Requested duration is outside the valid range.
    /// Trigger: zero duration, or duration above the model ceiling.
    InvalidDuration,

    /// Prompt text is invalid.
    /// Trigger: empty prompt or exceeds 1000 characters.
    InvalidPrompt,

    /// Failed to encode or persist an audio artifact.
    /// Trigger: empty waveform, zero channels, or unwritable path.
    EncodingFailed,

    /// A hosted API call failed.
    /// Trigger: transport error, non-success status, or malformed response
    /// from the chat-completion or speech-synthesis service.
    UpstreamService,

    /// A required API credential was not configured.
    /// Trigger: environment variable absent at startup for a requested
    /// feature (prompt expansion or voice-over).
    MissingCredential,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::ModelLoadFailed => "MODEL_LOAD_FAILED",
            ErrorCode::ModelDownloadFailed => "MODEL_DOWNLOAD_FAILED",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::InvalidDuration => "INVALID_DURATION",
            ErrorCode::InvalidPrompt => "INVALID_PROMPT",
            ErrorCode::EncodingFailed => "ENCODING_FAILED",
            ErrorCode::UpstreamService => "UPSTREAM_SERVICE",
            ErrorCode::MissingCredential => "MISSING_CREDENTIAL",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ModelNotFound => "Model weight files not found at expected path",
            ErrorCode::ModelLoadFailed => "Failed to load model weights into memory",
            ErrorCode::ModelDownloadFailed => "Failed to download model weights from remote source",
            ErrorCode::GenerationFailed => "Model inference failed during generation",
            ErrorCode::InvalidDuration => "Duration must be between 1 second and the model ceiling",
            ErrorCode::InvalidPrompt => "Prompt must be non-empty and at most 1000 characters",
            ErrorCode::EncodingFailed => "Failed to encode or persist the audio artifact",
            ErrorCode::UpstreamService => "A hosted API call failed",
            ErrorCode::MissingCredential => "A required API credential was not configured",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::ModelNotFound => {
                "Run once with network access to download weights automatically, \
                 or point --model-dir at a directory containing them"
            }
            ErrorCode::ModelLoadFailed => {
                "Check available memory (4GB+ recommended), verify weight files are not \
                 corrupted, or delete the model cache and re-download"
            }
            ErrorCode::ModelDownloadFailed => {
                "Check internet connection, verify disk space (500MB+ required), \
                 or try again later if HuggingFace is unavailable"
            }
            ErrorCode::GenerationFailed => {
                "Try reducing duration, or check system memory. If the issue persists, \
                 force CPU inference with --device cpu"
            }
            ErrorCode::InvalidDuration => {
                "Specify a duration between 1 second and the model ceiling \
                 (e.g. --duration 10)"
            }
            ErrorCode::InvalidPrompt => {
                "Provide a descriptive prompt between 1 and 1000 characters \
                 (e.g. 'lofi hip hop, jazzy piano, relaxing vibes')"
            }
            ErrorCode::EncodingFailed => {
                "Verify the output directory exists and is writable, and that the \
                 generated waveform is non-empty"
            }
            ErrorCode::UpstreamService => {
                "Check network connectivity and API key validity, then retry. \
                 The pipeline does not retry on its own"
            }
            ErrorCode::MissingCredential => {
                "Set OPENAI_API_KEY for prompt expansion or ELEVEN_API_KEY for \
                 voice-over, or run without the feature that needs it"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for pipeline operations.
#[derive(Debug)]
pub struct PipelineError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PipelineError {
    /// Creates a new PipelineError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new PipelineError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a MODEL_NOT_FOUND error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelNotFound,
            format!("Model files not found at: {}", path.into()),
        )
    }

    /// Creates a MODEL_LOAD_FAILED error.
    pub fn model_load_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelLoadFailed,
            format!("Failed to load model: {}", reason.into()),
        )
    }

    /// Creates a MODEL_DOWNLOAD_FAILED error.
    pub fn model_download_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelDownloadFailed,
            format!("Failed to download model: {}", reason.into()),
        )
    }

    /// Creates a GENERATION_FAILED error.
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            format!("Generation failed: {}", reason.into()),
        )
    }

    /// Creates an INVALID_DURATION error.
    pub fn invalid_duration(duration: u32, max: u32) -> Self {
        Self::new(
            ErrorCode::InvalidDuration,
            format!(
                "Invalid duration: {} seconds (must be between 1 and {})",
                duration, max
            ),
        )
    }

    /// Creates an INVALID_PROMPT error for empty prompts.
    pub fn empty_prompt() -> Self {
        Self::new(ErrorCode::InvalidPrompt, "Prompt cannot be empty")
    }

    /// Creates an INVALID_PROMPT error for prompts that are too long.
    pub fn prompt_too_long(len: usize) -> Self {
        Self::new(
            ErrorCode::InvalidPrompt,
            format!("Prompt too long: {} characters (maximum 1000)", len),
        )
    }

    /// Creates an ENCODING_FAILED error.
    pub fn encoding_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EncodingFailed,
            format!("Encoding failed: {}", reason.into()),
        )
    }

    /// Creates an UPSTREAM_SERVICE error.
    pub fn upstream(service: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamService,
            format!("{} request failed: {}", service, reason.into()),
        )
    }

    /// Creates a MISSING_CREDENTIAL error.
    pub fn missing_credential(var: &str) -> Self {
        Self::new(
            ErrorCode::MissingCredential,
            format!("Environment variable {} is not set", var),
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using PipelineError.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline stages, used to tag terminal errors with their origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Prompt expansion via the chat-completion service.
    Expand,
    /// Music generation by the engine.
    Generate,
    /// Waveform normalization and WAV encoding.
    Encode,
    /// Voice-over synthesis and persistence.
    Voice,
}

impl Stage {
    /// Returns the string representation of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Expand => "expand",
            Stage::Generate => "generate",
            Stage::Encode => "encode",
            Stage::Voice => "voice",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal error for a pipeline run.
///
/// A run aborts at the first failing stage; the stage is attached so callers
/// see where the run died. Already-written artifacts are left in place.
#[derive(Debug)]
pub struct RunError {
    /// The stage that failed.
    pub stage: Stage,
    /// The underlying failure.
    pub cause: PipelineError,
}

impl RunError {
    /// Wraps a PipelineError with the stage it occurred in.
    pub fn at(stage: Stage, cause: PipelineError) -> Self {
        Self { stage, cause }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage '{}' failed: {}", self.stage, self.cause)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
