//! Logits processing: classifier-free guidance and seeded top-k sampling.

use std::fmt::{Debug, Formatter};
use std::ops::Deref;

use half::f16;
use ndarray::{s, Array, Array2, Axis, Ix3, IxDyn};
use ort::tensor::ArrayExtensions;
use ort::value::DynValue;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::error::{PipelineError, Result};

/// Sampling parameters for token generation.
#[derive(Debug, Clone, Copy)]
pub struct SamplerParams {
    /// Classifier-free guidance scale. Higher values follow the prompt more
    /// closely at the cost of diversity.
    pub guidance_scale: f32,
    /// Number of top logits considered when sampling each token.
    pub top_k: usize,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            guidance_scale: 3.0,
            top_k: 250,
        }
    }
}

/// One decoder step's logits, `[batch, vocab]`.
pub struct Logits(Array2<f32>);

impl Deref for Logits {
    type Target = Array2<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Debug for Logits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Logits({:?})", self.0.dim())
    }
}

impl Logits {
    /// Extracts logits from a 3D decoder output tensor, f32 or f16.
    ///
    /// The decoder emits `[batch, decoder_seq_len, vocab]` with a sequence
    /// length of 1, so that axis is dropped.
    pub fn from_decoder_output(value: &DynValue) -> Result<Self> {
        let (shape, data): (Vec<usize>, Vec<f32>) =
            if let Ok((shape, data)) = value.try_extract_raw_tensor::<f32>() {
                (shape.iter().map(|&x| x as usize).collect(), data.to_vec())
            } else if let Ok((shape, data)) = value.try_extract_raw_tensor::<f16>() {
                (
                    shape.iter().map(|&x| x as usize).collect(),
                    data.iter().map(|e| f32::from(*e)).collect(),
                )
            } else {
                return Err(PipelineError::generation_failed("logits must be f32 or f16"));
            };

        let arr = Array::from_shape_vec(IxDyn(&shape), data).map_err(|e| {
            PipelineError::generation_failed(format!("failed to shape logits: {}", e))
        })?;

        let arr = arr
            .into_dimensionality::<Ix3>()
            .map_err(|e| PipelineError::generation_failed(format!("expected 3D logits: {}", e)))?;

        Ok(Self(arr.remove_axis(Axis(1))))
    }

    /// Applies classifier-free guidance.
    ///
    /// The batch holds conditional logits in its first half and unconditional
    /// logits in its second: `guided = uncond + (cond - uncond) * scale`.
    pub fn guided(self, guidance_scale: f32) -> Result<Self> {
        let batch = self.0.dim().0;
        if batch % 2 != 0 {
            return Err(PipelineError::generation_failed(format!(
                "guidance needs an even batch, got {}",
                batch
            )));
        }

        let half = batch / 2;
        let cond = self.0.slice(s![0..half, ..]);
        let uncond = self.0.slice(s![half.., ..]);

        Ok(Self(
            (cond.into_owned() - uncond) * guidance_scale + uncond,
        ))
    }

    /// Samples one token per batch row via top-k over the softmax.
    ///
    /// Returns `(token_id, log_probability)` pairs, one per row, drawn with
    /// the caller's RNG so seeded runs reproduce.
    pub fn sample_top_k<R: Rng>(&self, k: usize, rng: &mut R) -> Result<Vec<(i64, f32)>> {
        let mut sampled = Vec::with_capacity(self.0.dim().0);
        let probs = self.0.softmax(Axis(1));

        for row in probs.axis_iter(Axis(0)) {
            let k = k.min(row.len());

            let mut candidates: Vec<(i64, f32)> = row
                .iter()
                .enumerate()
                .map(|(i, p)| (i as i64, *p))
                .collect();

            candidates.sort_by(|a, b| {
                b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
            });
            candidates.truncate(k);

            let distribution =
                WeightedIndex::new(candidates.iter().map(|c| c.1)).map_err(|e| {
                    PipelineError::generation_failed(format!(
                        "failed to build sampling distribution: {}",
                        e
                    ))
                })?;

            let (token_id, prob) = candidates[distribution.sample(rng)];
            sampled.push((token_id, prob.ln()));
        }

        Ok(sampled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn guidance_halves_batch() {
        let arr = Array::from_shape_vec((2, 3), vec![10., -1., 3., -1., 1., 11.]).unwrap();
        let guided = Logits(arr).guided(3.0).unwrap();
        assert_eq!(guided.shape(), &[1, 3]);
    }

    #[test]
    fn guidance_rejects_odd_batch() {
        let arr = Array::from_shape_vec((3, 2), vec![0.; 6]).unwrap();
        assert!(Logits(arr).guided(3.0).is_err());
    }

    #[test]
    fn sample_returns_valid_token_ids() {
        let arr = Array::from_shape_vec((2, 3), vec![0.1, 0.2, 0.7, 0.3, 0.4, 0.3]).unwrap();
        let logits = Logits(arr);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sampled = logits.sample_top_k(2, &mut rng).unwrap();
        assert_eq!(sampled.len(), 2);
        for (id, _) in &sampled {
            assert!((0..3).contains(id));
        }
    }

    #[test]
    fn seeded_sampling_reproduces() {
        let arr = Array::from_shape_vec((1, 8), vec![0.5, 1.0, 0.2, 0.9, 0.1, 0.4, 0.3, 0.8])
            .unwrap();
        let logits = Logits(arr);

        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let first = logits.sample_top_k(4, &mut a).unwrap();
        let second = logits.sample_top_k(4, &mut b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn default_sampler_params() {
        let params = SamplerParams::default();
        assert_eq!(params.guidance_scale, 3.0);
        assert_eq!(params.top_k, 250);
    }
}
