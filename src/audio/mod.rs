//! Audio output: normalization strategies and the WAV writer.

pub mod normalize;
pub mod writer;

pub use normalize::Normalization;
pub use writer::{samples_to_duration, write_to_buffer, write_waveform, OUTPUT_CHANNELS};
