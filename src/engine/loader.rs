//! Engine loading and generation.
//!
//! An [`Engine`] owns the three ONNX sessions (text encoder, token decoder,
//! EnCodec decoder) for one model variant. Generation parameters travel in
//! the [`GenerationRequest`] rather than living on the handle, so a loaded
//! engine carries no per-call state.

use std::path::Path;

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::Device;
use crate::error::{PipelineError, Result};
use crate::types::{GenerationRequest, Waveform};

use super::audio_codec::AudioDecoder;
use super::decoder::TokenDecoder;
use super::device::device_label;
use super::logits::SamplerParams;
use super::model::{ModelConfig, ModelSpec, REQUIRED_WEIGHT_FILES, TOKENS_PER_SECOND};
use super::text_encoder::TextEncoder;

/// A loaded model variant, ready to generate.
pub struct Engine {
    text_encoder: TextEncoder,
    token_decoder: TokenDecoder,
    audio_decoder: AudioDecoder,
    config: ModelConfig,
    spec: ModelSpec,
    sampler: SamplerParams,
    device: &'static str,
}

impl Engine {
    /// Loads all sessions for a variant from a directory.
    ///
    /// The directory must contain the files listed in
    /// [`REQUIRED_WEIGHT_FILES`]; `config.json` is read when present,
    /// otherwise the variant defaults apply.
    pub fn load(
        model_dir: &Path,
        spec: ModelSpec,
        device: Device,
        threads: Option<u32>,
    ) -> Result<Self> {
        check_weights(model_dir)?;

        let label = device_label(device);
        info!("loading {} on {}", spec.version(), label);

        let config = read_config(model_dir, spec)?;
        if let Some(problem) = config.validate() {
            return Err(PipelineError::model_load_failed(format!(
                "inconsistent model config: {}",
                problem
            )));
        }

        let text_encoder = TextEncoder::load(model_dir, device, threads)?;
        let token_decoder = TokenDecoder::load(model_dir, config.clone(), device, threads)?;
        let audio_decoder = AudioDecoder::load(model_dir, device, threads)?;

        info!("all sessions loaded for {}", spec.version());

        Ok(Self {
            text_encoder,
            token_decoder,
            audio_decoder,
            config,
            spec,
            sampler: SamplerParams::default(),
            device: label,
        })
    }

    /// Output sample rate in Hz, fixed by the loaded model.
    ///
    /// Callers read the rate back from the handle rather than assuming it.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Maximum duration this engine will generate, in seconds.
    pub fn max_duration_sec(&self) -> u32 {
        self.spec.max_duration_sec()
    }

    /// Model version string.
    pub fn version(&self) -> &str {
        self.spec.version()
    }

    /// Label of the device running inference.
    pub fn device(&self) -> &str {
        self.device
    }

    /// Overrides the default sampling parameters.
    pub fn with_sampler(mut self, sampler: SamplerParams) -> Self {
        self.sampler = sampler;
        self
    }

    /// Generates a waveform for the request.
    ///
    /// Validates the request, encodes the prompt, samples
    /// `duration x 50` token frames, and decodes them to mono audio at the
    /// model's sample rate. Sampling is seeded from `request.seed` when
    /// present, entropy otherwise, so seeded requests reproduce.
    pub fn generate(&mut self, request: &GenerationRequest) -> Result<Waveform> {
        request.validate(self.max_duration_sec())?;

        let mut rng = match request.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let target_len = request.duration_sec as usize * TOKENS_PER_SECOND;

        info!("encoding prompt: \"{}\"", request.prompt);
        let (hidden_states, attention_mask) = self.text_encoder.encode(&request.prompt)?;

        info!("generating {} token frames...", target_len);
        let frames = self.token_decoder.generate_tokens(
            hidden_states,
            attention_mask,
            target_len,
            &self.sampler,
            &mut rng,
        )?;

        info!("decoding {} frames to audio...", frames.len());
        let samples = self.audio_decoder.decode(&frames)?;

        let waveform = Waveform::mono(samples, self.config.sample_rate);
        info!(
            "generated {} samples ({:.2}s at {}Hz)",
            waveform.samples.len(),
            waveform.duration_sec(),
            waveform.sample_rate
        );

        Ok(waveform)
    }
}

/// Checks that all required weight files exist in the directory.
pub fn check_weights(model_dir: &Path) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_WEIGHT_FILES
        .iter()
        .copied()
        .filter(|file| !model_dir.join(file).exists())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::model_not_found(format!(
            "{} (missing: {})",
            model_dir.display(),
            missing.join(", ")
        )))
    }
}

/// Reads architecture parameters from config.json, falling back to the
/// variant defaults when the file is absent.
fn read_config(model_dir: &Path, spec: ModelSpec) -> Result<ModelConfig> {
    let config_path = model_dir.join("config.json");
    if !config_path.exists() {
        return Ok(spec.default_config());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        PipelineError::model_load_failed(format!("failed to read config.json: {}", e))
    })?;

    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        PipelineError::model_load_failed(format!("failed to parse config.json: {}", e))
    })?;

    // The exported config nests decoder and text-encoder sections.
    let decoder = json.get("decoder").ok_or_else(|| {
        PipelineError::model_load_failed("config.json missing 'decoder' section")
    })?;

    let defaults = spec.default_config();

    let read_u32 = |section: &serde_json::Value, key: &str, fallback: u32| {
        section
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(fallback)
    };

    let text_encoder = json.get("text_encoder");

    Ok(ModelConfig {
        vocab_size: read_u32(decoder, "vocab_size", defaults.vocab_size),
        num_hidden_layers: read_u32(decoder, "num_hidden_layers", defaults.num_hidden_layers),
        num_attention_heads: read_u32(
            decoder,
            "num_attention_heads",
            defaults.num_attention_heads,
        ),
        d_model: text_encoder
            .map(|te| read_u32(te, "d_model", defaults.d_model))
            .unwrap_or(defaults.d_model),
        d_kv: text_encoder
            .map(|te| read_u32(te, "d_kv", defaults.d_kv))
            .unwrap_or(defaults.d_kv),
        sample_rate: defaults.sample_rate,
        codebooks: defaults.codebooks,
        pad_token_id: decoder
            .get("pad_token_id")
            .and_then(|v| v.as_i64())
            .unwrap_or(defaults.pad_token_id),
    })
}
