//! Music generation engine.
//!
//! Local MusicGen inference over ONNX Runtime:
//! - [`TextEncoder`](text_encoder::TextEncoder): prompt tokenization and T5 encoding
//! - [`TokenDecoder`](decoder::TokenDecoder): autoregressive generation with KV cache
//! - [`AudioDecoder`](audio_codec::AudioDecoder): EnCodec token-to-audio decoding
//! - [`CodebookDelays`](delay_pattern::CodebookDelays): 4-codebook delay bookkeeping
//! - [`Engine`](loader::Engine): the loaded handle tying them together

pub mod audio_codec;
pub mod decoder;
pub mod delay_pattern;
pub mod device;
pub mod downloader;
pub mod loader;
pub mod logits;
pub mod model;
pub mod text_encoder;

pub use delay_pattern::CodebookDelays;
pub use downloader::ensure_weights;
pub use loader::{check_weights, Engine};
pub use logits::SamplerParams;
pub use model::{ModelConfig, ModelSpec, REQUIRED_WEIGHT_FILES, TOKENS_PER_SECOND};
