//! Command-line interface.
//!
//! One invocation generates one track: intent in, artifact paths out.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::audio::Normalization;
use crate::config::{default_model_path, Device};
use crate::engine::ModelSpec;

/// Available model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    /// Smallest decoder, fastest generation
    #[default]
    Small,
    /// Mid-size decoder
    Medium,
    /// Largest decoder, best quality, slowest
    Large,
    /// Melody-conditioned variant
    Melody,
}

impl ModelArg {
    /// Maps the argument to the engine's model spec.
    pub fn to_spec(self) -> ModelSpec {
        match self {
            ModelArg::Small => ModelSpec::Small,
            ModelArg::Medium => ModelSpec::Medium,
            ModelArg::Large => ModelSpec::Large,
            ModelArg::Melody => ModelSpec::Melody,
        }
    }
}

/// Available execution devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    /// Detect the best available device
    #[default]
    Auto,
    /// Force CPU execution
    Cpu,
    /// NVIDIA GPU via CUDA
    Cuda,
    /// Apple Silicon via CoreML
    Metal,
}

impl DeviceArg {
    /// Maps the argument to the runtime device selection.
    pub fn to_device(self) -> Device {
        match self {
            DeviceArg::Auto => Device::Auto,
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Cuda => Device::Cuda,
            DeviceArg::Metal => Device::Metal,
        }
    }
}

/// Available normalization strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum NormalizationArg {
    /// Pass samples through untouched
    None,
    /// Scale the peak to just below full scale
    Peak,
    /// Loudness-match with a soft-knee compressor
    #[default]
    Loudness,
}

impl NormalizationArg {
    /// Maps the argument to the writer's strategy.
    pub fn to_strategy(self) -> Normalization {
        match self {
            NormalizationArg::None => Normalization::None,
            NormalizationArg::Peak => Normalization::Peak,
            NormalizationArg::Loudness => Normalization::Loudness { compressor: true },
        }
    }
}

/// trackforge: prompt-to-music generation with optional prompt expansion
/// and voice-over
#[derive(Parser, Debug)]
#[command(name = "trackforge")]
#[command(about = "Generate a music track from a text prompt, with optional LLM prompt expansion and voice-over")]
#[command(version)]
pub struct Cli {
    /// Text intent or full description of the music to generate
    pub intent: String,

    /// Duration of audio to generate in seconds
    #[arg(short, long, default_value = "8")]
    pub duration: u32,

    /// Expand the intent into a richer prompt via the chat-completion API
    /// (requires OPENAI_API_KEY)
    #[arg(short, long)]
    pub expand: bool,

    /// Voice-over text to synthesize alongside the track
    /// (requires ELEVEN_API_KEY)
    #[arg(long)]
    pub voice_text: Option<String>,

    /// Model variant to generate with
    #[arg(short, long, value_enum, default_value_t = ModelArg::Small)]
    pub model: ModelArg,

    /// Directory containing model weight files
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Directory to write artifacts into
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Random seed for reproducible sampling
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Execution device for inference
    #[arg(long, value_enum, default_value_t = DeviceArg::Auto)]
    pub device: DeviceArg,

    /// Number of threads for CPU inference
    #[arg(long)]
    pub threads: Option<u32>,

    /// Normalization strategy applied before encoding
    #[arg(short, long, value_enum, default_value_t = NormalizationArg::Loudness)]
    pub normalization: NormalizationArg,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns the effective model directory.
    ///
    /// Defaults to a per-variant subdirectory of the platform cache.
    pub fn model_directory(&self) -> PathBuf {
        if let Some(ref path) = self.model_dir {
            path.clone()
        } else {
            default_model_path().join(self.model.to_spec().as_str())
        }
    }

    /// Returns the effective output directory.
    pub fn output_directory(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            intent: "lofi beats".to_string(),
            duration: 8,
            expand: false,
            voice_text: None,
            model: ModelArg::Small,
            model_dir: None,
            output_dir: None,
            seed: None,
            device: DeviceArg::Auto,
            threads: None,
            normalization: NormalizationArg::Loudness,
        }
    }

    #[test]
    fn model_arg_mapping() {
        assert_eq!(ModelArg::Small.to_spec(), ModelSpec::Small);
        assert_eq!(ModelArg::Melody.to_spec(), ModelSpec::Melody);
    }

    #[test]
    fn device_arg_mapping() {
        assert_eq!(DeviceArg::Cpu.to_device(), Device::Cpu);
        assert_eq!(DeviceArg::Metal.to_device(), Device::Metal);
    }

    #[test]
    fn normalization_arg_mapping() {
        assert_eq!(NormalizationArg::None.to_strategy(), Normalization::None);
        assert_eq!(
            NormalizationArg::Loudness.to_strategy(),
            Normalization::Loudness { compressor: true }
        );
    }

    #[test]
    fn model_directory_includes_variant() {
        let mut cli = base_cli();
        cli.model = ModelArg::Medium;
        assert!(cli.model_directory().to_string_lossy().contains("medium"));
    }

    #[test]
    fn explicit_model_dir_wins() {
        let mut cli = base_cli();
        cli.model_dir = Some(PathBuf::from("/opt/weights"));
        assert_eq!(cli.model_directory(), PathBuf::from("/opt/weights"));
    }

    #[test]
    fn output_directory_defaults_to_cwd() {
        assert_eq!(base_cli().output_directory(), PathBuf::from("."));
    }
}
