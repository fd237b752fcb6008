//! Autoregressive token decoder with KV cache.
//!
//! Uses the split decoder export: one graph for the first pass (which also
//! produces the encoder-side cache) and one for subsequent passes that reuse
//! it. Each step samples one token per codebook under classifier-free
//! guidance.

use std::borrow::Cow;
use std::path::Path;

use half::f16;
use log::debug;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};
use rand_chacha::ChaCha8Rng;

use crate::config::Device;
use crate::error::{PipelineError, Result};

use super::delay_pattern::CodebookDelays;
use super::device::session_from_file;
use super::logits::{Logits, SamplerParams};
use super::model::ModelConfig;

/// Split-architecture token decoder.
pub struct TokenDecoder {
    first_pass: Session,
    with_past: Session,
    config: ModelConfig,
}

impl TokenDecoder {
    /// Loads `decoder_model.onnx` and `decoder_with_past_model.onnx` from the
    /// model directory.
    pub fn load(
        model_dir: &Path,
        config: ModelConfig,
        device: Device,
        threads: Option<u32>,
    ) -> Result<Self> {
        let first_pass = session_from_file(&model_dir.join("decoder_model.onnx"), device, threads)?;
        let with_past =
            session_from_file(&model_dir.join("decoder_with_past_model.onnx"), device, threads)?;

        Ok(Self {
            first_pass,
            with_past,
            config,
        })
    }

    /// Generates `target_len` de-delayed token frames.
    ///
    /// The loop runs `target_len + N - 1` steps because the delay pattern
    /// withholds the first N-1 diagonals (N = 4 codebooks).
    pub fn generate_tokens(
        &mut self,
        encoder_hidden_states: DynValue,
        encoder_attention_mask: DynValue,
        target_len: usize,
        sampler: &SamplerParams,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<[i64; 4]>> {
        let step_count = target_len + 3;
        let num_layers = self.config.num_hidden_layers as usize;
        let pad = self.config.pad_token_id;

        // Conditional + unconditional halves for classifier-free guidance.
        let hidden_states = stack_unconditional(&encoder_hidden_states)?;
        let attention_mask = stack_unconditional_i64(&encoder_attention_mask)?;

        let initial_ids = Tensor::from_array(([8usize, 1], vec![pad; 8])).map_err(|e| {
            PipelineError::generation_failed(format!("failed to create input_ids: {}", e))
        })?;

        let first_inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
            (
                Cow::from("encoder_attention_mask"),
                SessionInputValue::from(attention_mask.view()),
            ),
            (
                Cow::from("encoder_hidden_states"),
                SessionInputValue::from(hidden_states.view()),
            ),
            (
                Cow::from("input_ids"),
                SessionInputValue::from(initial_ids.view()),
            ),
        ];

        let mut outputs = self.first_pass.run(first_inputs).map_err(|e| {
            PipelineError::generation_failed(format!("initial decoder inference failed: {}", e))
        })?;

        let mut delays = CodebookDelays::<4>::new();

        let logits = outputs
            .remove("logits")
            .ok_or_else(|| PipelineError::generation_failed("logits not found in output"))?;
        let sampled = Logits::from_decoder_output(&logits)?
            .guided(sampler.guidance_scale)?
            .sample_top_k(sampler.top_k, rng)?;
        delays.push(sampled.iter().map(|s| s.0));

        // The first pass emits the full cache; encoder halves stay fixed for
        // the rest of the run.
        let mut kv_cache: Vec<(String, DynValue)> = Vec::with_capacity(num_layers * 4);
        for layer in 0..num_layers {
            for side in ["decoder", "encoder"] {
                for kind in ["key", "value"] {
                    let present = outputs
                        .remove(&format!("present.{layer}.{side}.{kind}"))
                        .ok_or_else(|| {
                            PipelineError::generation_failed(format!(
                                "present.{layer}.{side}.{kind} not found"
                            ))
                        })?;
                    kv_cache.push((format!("past_key_values.{layer}.{side}.{kind}"), present));
                }
            }
        }

        let mut frames = Vec::with_capacity(target_len);

        for step in 0..step_count {
            let [a, b, c, d] = delays.last_masked(pad);

            let input_ids = Tensor::from_array(([8usize, 1], vec![a, b, c, d, a, b, c, d]))
                .map_err(|e| {
                    PipelineError::generation_failed(format!("failed to create input_ids: {}", e))
                })?;

            let mut step_inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
                (
                    Cow::from("input_ids"),
                    SessionInputValue::from(input_ids.view()),
                ),
                (
                    Cow::from("encoder_attention_mask"),
                    SessionInputValue::from(attention_mask.view()),
                ),
            ];

            for (name, value) in &kv_cache {
                step_inputs.push((Cow::from(name.as_str()), SessionInputValue::from(value.view())));
            }

            let mut outputs = self.with_past.run(step_inputs).map_err(|e| {
                PipelineError::generation_failed(format!(
                    "decoder with past inference failed: {}",
                    e
                ))
            })?;

            let logits = outputs
                .remove("logits")
                .ok_or_else(|| PipelineError::generation_failed("logits not found"))?;
            let sampled = Logits::from_decoder_output(&logits)?
                .guided(sampler.guidance_scale)?
                .sample_top_k(sampler.top_k, rng)?;
            delays.push(sampled.iter().map(|s| s.0));

            if let Some(frame) = delays.last_undelayed() {
                frames.push(frame);
            }

            // Only the decoder-side cache grows; swap those entries in place.
            for layer in 0..num_layers {
                for (offset, kind) in ["key", "value"].iter().enumerate() {
                    let present = outputs
                        .remove(&format!("present.{layer}.decoder.{kind}"))
                        .ok_or_else(|| {
                            PipelineError::generation_failed(format!(
                                "present.{layer}.decoder.{kind} not found"
                            ))
                        })?;
                    kv_cache[layer * 4 + offset] =
                        (format!("past_key_values.{layer}.decoder.{kind}"), present);
                }
            }

            if (step + 1) % 100 == 0 {
                debug!("decoded {}/{} steps", step + 1, step_count);
            }
        }

        frames.truncate(target_len);
        Ok(frames)
    }
}

/// Doubles a float tensor along its batch axis, zero-filling the new half.
///
/// The zero half is the unconditional branch for classifier-free guidance.
/// Handles both f16 and f32 exports.
fn stack_unconditional(tensor: &DynValue) -> Result<DynValue> {
    if let Ok(result) = stack_unconditional_typed::<f16>(tensor) {
        return Ok(result);
    }
    stack_unconditional_typed::<f32>(tensor)
}

fn stack_unconditional_typed<T>(tensor: &DynValue) -> Result<DynValue>
where
    T: ort::tensor::PrimitiveTensorElementType + Clone + Default + std::fmt::Debug + 'static,
{
    let (shape, data) = tensor.try_extract_raw_tensor::<T>().map_err(|e| {
        PipelineError::generation_failed(format!("failed to extract tensor: {}", e))
    })?;

    let mut new_shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
    new_shape[0] *= 2;

    let zeros = vec![T::default(); data.len()];
    let stacked: Vec<T> = data.to_vec().into_iter().chain(zeros).collect();

    let result = Tensor::from_array((new_shape, stacked)).map_err(|e| {
        PipelineError::generation_failed(format!("failed to create stacked tensor: {}", e))
    })?;

    Ok(result.into_dyn())
}

fn stack_unconditional_i64(tensor: &DynValue) -> Result<DynValue> {
    let (shape, data) = tensor.try_extract_raw_tensor::<i64>().map_err(|e| {
        PipelineError::generation_failed(format!("failed to extract i64 tensor: {}", e))
    })?;

    let mut new_shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
    new_shape[0] *= 2;

    let zeros = vec![0i64; data.len()];
    let stacked: Vec<i64> = data.to_vec().into_iter().chain(zeros).collect();

    let result = Tensor::from_array((new_shape, stacked)).map_err(|e| {
        PipelineError::generation_failed(format!("failed to create stacked i64 tensor: {}", e))
    })?;

    Ok(result.into_dyn())
}

#[cfg(test)]
mod tests {
    // Decode-loop tests need ONNX graphs on disk; the delay-pattern and
    // logits modules cover the in-memory halves of each step.
}
