//! Model variants and architecture configuration.
//!
//! A [`ModelSpec`] selects one of the pretrained MusicGen variants; an
//! external collaborator (HuggingFace) resolves it to weight files. The
//! [`ModelConfig`] carries the architecture parameters the decoder needs for
//! tensor shape allocation, read from the model's config.json when present.

use serde::{Deserialize, Serialize};

/// Number of token frames generated per second of audio.
pub const TOKENS_PER_SECOND: usize = 50;

/// Weight files every variant needs before it can load.
pub const REQUIRED_WEIGHT_FILES: &[&str] = &[
    "tokenizer.json",
    "text_encoder.onnx",
    "decoder_model.onnx",
    "decoder_with_past_model.onnx",
    "encodec_decode.onnx",
];

/// Remote repository the weight files are fetched from.
const WEIGHT_REPO_BASE: &str = "https://huggingface.co/gabotechs/music_gen/resolve/main";

/// Pretrained model variant.
///
/// All variants emit mono audio at 32kHz; they differ in decoder size (and
/// therefore quality and generation speed). Melody additionally accepts
/// melodic conditioning upstream, which this pipeline drives with text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    /// Smallest decoder, fastest generation.
    #[default]
    Small,
    /// Mid-size decoder.
    Medium,
    /// Largest decoder, best quality, slowest.
    Large,
    /// Melody-conditioned variant.
    Melody,
}

impl ModelSpec {
    /// Returns the string representation of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSpec::Small => "small",
            ModelSpec::Medium => "medium",
            ModelSpec::Large => "large",
            ModelSpec::Melody => "melody",
        }
    }

    /// Parses a variant from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "small" => Some(ModelSpec::Small),
            "medium" => Some(ModelSpec::Medium),
            "large" => Some(ModelSpec::Large),
            "melody" => Some(ModelSpec::Melody),
            _ => None,
        }
    }

    /// Output sample rate in Hz. Fixed by the model family.
    pub fn sample_rate(&self) -> u32 {
        32000
    }

    /// Maximum supported duration in seconds.
    pub fn max_duration_sec(&self) -> u32 {
        120
    }

    /// Model version string used for artifact ids and reporting.
    pub fn version(&self) -> &'static str {
        match self {
            ModelSpec::Small => "musicgen-small-fp16-v1",
            ModelSpec::Medium => "musicgen-medium-fp16-v1",
            ModelSpec::Large => "musicgen-large-fp16-v1",
            ModelSpec::Melody => "musicgen-melody-fp16-v1",
        }
    }

    /// Download URLs for this variant's weight files, `(filename, url)` pairs.
    ///
    /// Tokenizer and config live under the plain variant directory; the ONNX
    /// graphs under its fp16 export.
    pub fn weight_urls(&self) -> Vec<(&'static str, String)> {
        let dir = self.as_str();
        vec![
            ("config.json", format!("{}/{}/config.json", WEIGHT_REPO_BASE, dir)),
            (
                "tokenizer.json",
                format!("{}/{}/tokenizer.json", WEIGHT_REPO_BASE, dir),
            ),
            (
                "text_encoder.onnx",
                format!("{}/{}_fp16/text_encoder.onnx", WEIGHT_REPO_BASE, dir),
            ),
            (
                "decoder_model.onnx",
                format!("{}/{}_fp16/decoder_model.onnx", WEIGHT_REPO_BASE, dir),
            ),
            (
                "decoder_with_past_model.onnx",
                format!("{}/{}_fp16/decoder_with_past_model.onnx", WEIGHT_REPO_BASE, dir),
            ),
            (
                "encodec_decode.onnx",
                format!("{}/{}_fp16/encodec_decode.onnx", WEIGHT_REPO_BASE, dir),
            ),
        ]
    }

    /// Architecture defaults for this variant, used when config.json is
    /// absent from the model directory.
    pub fn default_config(&self) -> ModelConfig {
        match self {
            ModelSpec::Small => ModelConfig {
                vocab_size: 2048,
                num_hidden_layers: 24,
                num_attention_heads: 16,
                d_model: 1024,
                d_kv: 64,
                sample_rate: 32000,
                codebooks: 4,
                pad_token_id: 2048,
            },
            ModelSpec::Medium | ModelSpec::Melody => ModelConfig {
                vocab_size: 2048,
                num_hidden_layers: 48,
                num_attention_heads: 24,
                d_model: 1536,
                d_kv: 64,
                sample_rate: 32000,
                codebooks: 4,
                pad_token_id: 2048,
            },
            ModelSpec::Large => ModelConfig {
                vocab_size: 2048,
                num_hidden_layers: 48,
                num_attention_heads: 32,
                d_model: 2048,
                d_kv: 64,
                sample_rate: 32000,
                codebooks: 4,
                pad_token_id: 2048,
            },
        }
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Architecture parameters for the loaded decoder.
///
/// Values come from the model's config.json; the variant defaults are used
/// when the file is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Token vocabulary size.
    pub vocab_size: u32,

    /// Number of decoder transformer layers.
    pub num_hidden_layers: u32,

    /// Number of attention heads in each layer.
    pub num_attention_heads: u32,

    /// Hidden dimension size.
    pub d_model: u32,

    /// Key/value dimension per attention head.
    pub d_kv: u32,

    /// Output sample rate in Hz.
    pub sample_rate: u32,

    /// Number of EnCodec codebooks.
    pub codebooks: u32,

    /// Padding token ID for the decoder.
    pub pad_token_id: i64,
}

impl ModelConfig {
    /// Validates the configuration for consistency.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.vocab_size == 0 {
            return Some("vocab_size must be > 0".to_string());
        }

        if self.num_hidden_layers == 0 {
            return Some("num_hidden_layers must be > 0".to_string());
        }

        if self.num_attention_heads == 0 {
            return Some("num_attention_heads must be > 0".to_string());
        }

        if self.d_model == 0 {
            return Some("d_model must be > 0".to_string());
        }

        let expected_d_kv = self.d_model / self.num_attention_heads;
        if self.d_kv != expected_d_kv {
            return Some(format!(
                "d_kv ({}) should be d_model / num_attention_heads ({})",
                self.d_kv, expected_d_kv
            ));
        }

        if self.codebooks != 4 {
            return Some(format!("codebooks must be 4, got {}", self.codebooks));
        }

        None
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelSpec::Small.default_config()
    }
}
