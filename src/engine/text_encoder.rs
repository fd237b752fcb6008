//! Text prompt encoder.
//!
//! Tokenizes the prompt and runs it through the T5 text encoder to produce
//! the hidden states the token decoder conditions on.

use std::path::Path;

use ort::value::{DynValue, Tensor};
use tokenizers::Tokenizer;

use crate::config::Device;
use crate::error::{PipelineError, Result};

use super::device::session_from_file;

/// Tokenizer plus T5 encoder session.
pub struct TextEncoder {
    tokenizer: Tokenizer,
    session: ort::session::Session,
}

impl TextEncoder {
    /// Loads `tokenizer.json` and `text_encoder.onnx` from the model
    /// directory.
    pub fn load(model_dir: &Path, device: Device, threads: Option<u32>) -> Result<Self> {
        let tokenizer_path = model_dir.join("tokenizer.json");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            PipelineError::model_load_failed(format!("failed to load tokenizer: {}", e))
        })?;

        tokenizer
            .with_padding(None)
            .with_truncation(None)
            .map_err(|e| {
                PipelineError::model_load_failed(format!("failed to configure tokenizer: {}", e))
            })?;

        let session = session_from_file(&model_dir.join("text_encoder.onnx"), device, threads)?;

        Ok(Self { tokenizer, session })
    }

    /// Encodes a prompt into `(last_hidden_state, attention_mask)` tensors.
    pub fn encode(&mut self, prompt: &str) -> Result<(DynValue, DynValue)> {
        let token_ids: Vec<i64> = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| PipelineError::generation_failed(format!("tokenization failed: {}", e)))?
            .get_ids()
            .iter()
            .map(|id| *id as i64)
            .collect();

        let token_count = token_ids.len();

        let input_ids = Tensor::from_array(([1, token_count], token_ids)).map_err(|e| {
            PipelineError::generation_failed(format!("failed to create input tensor: {}", e))
        })?;

        let attention_mask =
            Tensor::from_array(([1, token_count], vec![1i64; token_count])).map_err(|e| {
                PipelineError::generation_failed(format!("failed to create attention mask: {}", e))
            })?;

        let inputs = ort::inputs![input_ids, attention_mask].map_err(|e| {
            PipelineError::generation_failed(format!("text encoder inference failed: {}", e))
        })?;
        let mut output = self.session.run(inputs).map_err(|e| {
            PipelineError::generation_failed(format!("text encoder inference failed: {}", e))
        })?;

        let hidden_states = output.remove("last_hidden_state").ok_or_else(|| {
            PipelineError::generation_failed("last_hidden_state not found in output")
        })?;

        // Fresh mask for the decoder; the first one was consumed by run().
        let decoder_mask =
            Tensor::from_array(([1, token_count], vec![1i64; token_count])).map_err(|e| {
                PipelineError::generation_failed(format!(
                    "failed to create decoder attention mask: {}",
                    e
                ))
            })?;

        Ok((hidden_states, decoder_mask.into_dyn()))
    }
}

#[cfg(test)]
mod tests {
    // Encoding tests need the tokenizer and ONNX graph on disk; the loader
    // tests cover the missing-file paths without them.
}
