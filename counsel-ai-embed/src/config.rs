//! Configuration for embedding providers.

use serde::{Deserialize, Serialize};

/// Default target dimension, matching the production vector index
/// (all-MiniLM-L6-v2 natively emits 384-dimension vectors).
pub const DEFAULT_TARGET_DIMENSION: usize = 384;

/// Configuration for an embedding provider plus the dimension the vector
/// index requires.
///
/// `target_dimension` must match the configured vector index exactly; every
/// stored and query vector is reconciled to it by
/// [`NormalizedEmbedder`](crate::normalizer::NormalizedEmbedder) regardless
/// of the model's native output width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Name of the embedding model (e.g. "all-MiniLM-L6-v2")
    pub model_name: String,
    /// Vector length required by the configured index
    pub target_dimension: usize,
    /// How many texts to embed per blocking batch
    pub batch_size: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2".to_string(),
            target_dimension: DEFAULT_TARGET_DIMENSION,
            batch_size: 16,
        }
    }
}

impl EmbedConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn with_target_dimension(mut self, target_dimension: usize) -> Self {
        self.target_dimension = target_dimension;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}
