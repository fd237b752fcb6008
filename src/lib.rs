//! trackforge: prompt-to-music generation pipeline.
//!
//! Generates a short music track from a text prompt with a local MusicGen
//! ONNX engine, optionally enriching the prompt through a hosted
//! chat-completion model and attaching a synthesized voice-over.
//!
//! # Modules
//!
//! - [`types`]: core data types (TrackRequest, GenerationRequest, Waveform, AudioArtifact)
//! - [`engine`]: local MusicGen inference over ONNX Runtime
//! - [`audio`]: normalization strategies and the WAV writer
//! - [`expander`]: chat-completion prompt expansion adapter
//! - [`voice`]: text-to-speech voice-over adapter
//! - [`pipeline`]: the orchestrator tying the stages together
//! - [`config`]: runtime configuration and explicit credentials
//! - [`error`]: error codes and the stage-tagged run error
//!
//! # Example
//!
//! ```rust,ignore
//! use trackforge::{
//!     config::Device,
//!     engine::{Engine, ModelSpec},
//!     pipeline::TrackPipeline,
//!     types::TrackRequest,
//! };
//!
//! let engine = Engine::load(model_dir, ModelSpec::Small, Device::Auto, None)?;
//! let mut pipeline = TrackPipeline::new(engine, "./out");
//!
//! let request = TrackRequest::new("a chill lofi hip hop beat", 8).with_seed(42);
//! let outcome = pipeline.run(&request)?;
//! println!("track at {}", outcome.music.path.display());
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod expander;
pub mod pipeline;
pub mod types;
pub mod voice;

// Re-export commonly used types at crate root for convenience
pub use audio::Normalization;
pub use config::{AppConfig, Credentials, Device};
pub use engine::{Engine, ModelSpec};
pub use error::{ErrorCode, PipelineError, Result, RunError, Stage};
pub use expander::{ExpanderConfig, PromptExpander};
pub use pipeline::{Generator, RunOutcome, TrackPipeline};
pub use types::{AudioArtifact, GenerationRequest, TrackRequest, Waveform};
pub use voice::{VoiceConfig, VoiceSynthesizer};
