//! EnCodec audio decoder.
//!
//! Turns the generated 4-codebook token sequence into f32 audio samples.

use std::path::Path;

use half::f16;
use ort::value::{DynValue, Tensor};

use crate::config::Device;
use crate::error::{PipelineError, Result};

use super::device::session_from_file;

/// EnCodec decode session.
pub struct AudioDecoder {
    session: ort::session::Session,
}

impl AudioDecoder {
    /// Loads `encodec_decode.onnx` from the model directory.
    pub fn load(model_dir: &Path, device: Device, threads: Option<u32>) -> Result<Self> {
        let session = session_from_file(&model_dir.join("encodec_decode.onnx"), device, threads)?;
        Ok(Self { session })
    }

    /// Decodes token frames into audio samples.
    ///
    /// Each frame holds one token per codebook. Empty input decodes to empty
    /// audio.
    pub fn decode(&mut self, frames: &[[i64; 4]]) -> Result<Vec<f32>> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let seq_len = frames.len();

        // EnCodec wants [1, 1, 4, seq_len]: codebook-major, so transpose the
        // frame-major input.
        let mut codebook_major = vec![0i64; seq_len * 4];
        for (t, frame) in frames.iter().enumerate() {
            for (c, token) in frame.iter().enumerate() {
                codebook_major[c * seq_len + t] = *token;
            }
        }

        let input = Tensor::from_array(([1usize, 1, 4, seq_len], codebook_major)).map_err(|e| {
            PipelineError::generation_failed(format!("failed to create token tensor: {}", e))
        })?;

        let inputs = ort::inputs![input].map_err(|e| {
            PipelineError::generation_failed(format!("audio codec inference failed: {}", e))
        })?;
        let mut outputs = self.session.run(inputs).map_err(|e| {
            PipelineError::generation_failed(format!("audio codec inference failed: {}", e))
        })?;

        let audio: DynValue = outputs.remove("audio_values").ok_or_else(|| {
            PipelineError::generation_failed("audio_values not found in output")
        })?;

        if let Ok((_shape, data)) = audio.try_extract_raw_tensor::<f32>() {
            return Ok(data.to_vec());
        }
        if let Ok((_shape, data)) = audio.try_extract_raw_tensor::<f16>() {
            return Ok(data.iter().map(|s| f32::from(*s)).collect());
        }

        Err(PipelineError::generation_failed(
            "audio values must be either f16 or f32",
        ))
    }
}
