//! Normalization strategies applied before encoding.
//!
//! Mirrors the generation model's output conventions: raw engine output is
//! mono f32 with no level guarantee, so the writer levels it according to an
//! enumerated policy before the samples hit the container.

use serde::{Deserialize, Serialize};

/// Peak level targeted by peak and loudness normalization.
const PEAK_CEILING: f32 = 0.99;

/// RMS level in dBFS targeted by loudness normalization.
const LOUDNESS_TARGET_DB: f32 = -14.0;

/// Level-adjustment policy applied to a waveform before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Pass samples through untouched.
    None,

    /// Scale so the absolute peak hits just below full scale.
    Peak,

    /// Match the RMS level to a fixed loudness target, optionally running a
    /// soft-knee compressor first to tame transients the gain would push
    /// past full scale.
    Loudness {
        /// Apply the soft-knee compressor before the gain stage.
        compressor: bool,
    },
}

impl Default for Normalization {
    fn default() -> Self {
        Normalization::Loudness { compressor: true }
    }
}

impl Normalization {
    /// Returns the string representation of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Normalization::None => "none",
            Normalization::Peak => "peak",
            Normalization::Loudness { .. } => "loudness",
        }
    }

    /// Parses a strategy from a string. "loudness" enables the compressor.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Normalization::None),
            "peak" => Some(Normalization::Peak),
            "loudness" => Some(Normalization::Loudness { compressor: true }),
            _ => None,
        }
    }

    /// Applies the strategy to a sample buffer.
    pub fn apply(&self, samples: &mut [f32]) {
        match self {
            Normalization::None => {}
            Normalization::Peak => peak_normalize(samples),
            Normalization::Loudness { compressor } => {
                if *compressor {
                    soft_compress(samples);
                }
                loudness_normalize(samples);
            }
        }
    }
}

impl std::fmt::Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scales the buffer so its absolute peak sits at [`PEAK_CEILING`].
///
/// Silent buffers are left untouched.
fn peak_normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }
    let gain = PEAK_CEILING / peak;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Applies gain so the buffer's RMS level matches [`LOUDNESS_TARGET_DB`],
/// then clamps at the peak ceiling so the gain stage can never clip.
fn loudness_normalize(samples: &mut [f32]) {
    if samples.is_empty() {
        return;
    }

    let mean_square: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum::<f64>()
        / samples.len() as f64;
    let rms = mean_square.sqrt() as f32;
    if rms <= f32::EPSILON {
        return;
    }

    let current_db = 20.0 * rms.log10();
    let gain = 10f32.powf((LOUDNESS_TARGET_DB - current_db) / 20.0);

    for s in samples.iter_mut() {
        *s = (*s * gain).clamp(-PEAK_CEILING, PEAK_CEILING);
    }
}

/// Soft-knee compressor: tanh-shapes the buffer relative to its peak,
/// reducing crest factor before the loudness gain stage.
fn soft_compress(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }
    let knee = peak.tanh();
    for s in samples.iter_mut() {
        *s = (*s / peak).tanh() * knee;
    }
}
