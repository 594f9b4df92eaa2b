//! Configuration for the SMILES encoder.

use serde::{Deserialize, Serialize};

/// Configuration for the ChemBERTa encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Hugging Face model ID
    pub model_id: String,

    /// Maximum sequence length in tokens (default: 512)
    pub max_length: usize,

    /// Batch size for inference (default: 32)
    pub batch_size: usize,

    /// L2-normalize embeddings (default: false; the interaction model was
    /// trained on raw mean-pooled states)
    pub normalize: bool,

    /// Pooling strategy (default: mean)
    pub pooling: super::PoolingStrategy,

    /// Use GPU if available (default: true)
    pub use_gpu: bool,

    /// Maximum embedding cache size in entries (0 disables the cache)
    pub cache_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model_id: "seyonec/ChemBERTa-zinc-base-v1".to_string(),
            max_length: 512,
            batch_size: 32,
            normalize: false,
            pooling: super::PoolingStrategy::Mean,
            use_gpu: true,
            cache_size: 10_000,
        }
    }
}

impl EncoderConfig {
    /// Create config for CPU-only inference.
    pub fn cpu() -> Self {
        Self {
            use_gpu: false,
            ..Default::default()
        }
    }

    /// Use a custom model.
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the embedding cache capacity.
    pub fn with_cache_size(mut self, entries: usize) -> Self {
        self.cache_size = entries;
        self
    }
}
