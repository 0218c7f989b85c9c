//! Embedding provider implementations.
//!
//! [`EmbeddingProvider`] is the seam between the retrieval pipeline and any
//! concrete embedding backend. [`FastEmbedProvider`] runs a local ONNX model
//! through fastembed; the model is loaded once per process and shared.

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// The result of embedding one or more texts.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// One vector per input text, in input order
    pub embeddings: Vec<Vec<f32>>,
    /// Length of every vector in `embeddings`
    pub dimension: usize,
}

impl EmbeddingResult {
    pub fn new(embeddings: Vec<Vec<f32>>, dimension: usize) -> Self {
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Abstract interface for generating text embeddings.
///
/// Implementations must be deterministic for a given input and return
/// vectors of a fixed dimension reported by [`embedding_dimension`].
///
/// [`embedding_dimension`]: EmbeddingProvider::embedding_dimension
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Native output dimension of this provider's model.
    fn embedding_dimension(&self) -> usize;

    /// Human-readable name for logs.
    fn provider_name(&self) -> &str;
}

// One loaded model per model name, shared across all provider instances in
// the process. Model init is expensive (ONNX session + tokenizer).
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, Arc<Mutex<TextEmbedding>>>>> = OnceLock::new();

fn model_cache() -> &'static Mutex<HashMap<String, Arc<Mutex<TextEmbedding>>>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Embedding provider backed by a local fastembed model.
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

/// Map a configured model name onto a fastembed built-in model.
fn builtin_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, 384))
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => {
            Ok((EmbeddingModel::BGESmallENV15, 384))
        }
        other => Err(EmbedError::invalid_config(format!(
            "unsupported embedding model: {other}"
        ))),
    }
}

impl FastEmbedProvider {
    /// Create a provider for the configured model, loading it if this is the
    /// first use of that model in the process.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let (model_kind, dimension) = builtin_model(config.model_name())?;
        let model_name = config.model_name().to_string();

        let cached = {
            let cache = model_cache()
                .lock()
                .map_err(|_| EmbedError::invalid_config("model cache lock poisoned"))?;
            cache.get(&model_name).cloned()
        };

        let model = match cached {
            Some(model) => model,
            None => {
                tracing::info!(model = %model_name, "loading embedding model");
                let loaded = tokio::task::spawn_blocking(move || {
                    TextEmbedding::try_new(InitOptions::new(model_kind))
                        .map_err(|e| EmbedError::External { source: e })
                })
                .await??;
                let shared = Arc::new(Mutex::new(loaded));
                let mut cache = model_cache()
                    .lock()
                    .map_err(|_| EmbedError::invalid_config("model cache lock poisoned"))?;
                cache
                    .entry(model_name)
                    .or_insert_with(|| shared.clone())
                    .clone()
            }
        };

        Ok(Self {
            config,
            model,
            dimension,
        })
    }

    fn embed_batch_blocking(
        model: &Arc<Mutex<TextEmbedding>>,
        batch: Vec<String>,
    ) -> Result<Vec<Vec<f32>>> {
        let mut guard = model
            .lock()
            .map_err(|_| EmbedError::invalid_config("model lock poisoned"))?;
        guard
            .embed(batch, None)
            .map_err(|e| EmbedError::External { source: e })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let texts = [text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or(EmbedError::EmptyInput)
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(Vec::new(), self.dimension));
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbedError::EmptyInput);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let model = self.model.clone();
            let batch: Vec<String> = batch.to_vec();
            let batch_embeddings =
                tokio::task::spawn_blocking(move || Self::embed_batch_blocking(&model, batch))
                    .await??;
            embeddings.extend(batch_embeddings);
        }

        for embedding in &mut embeddings {
            l2_normalize(embedding);
        }

        Ok(EmbeddingResult::new(embeddings, self.dimension))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        self.config.model_name()
    }
}

/// Normalize a vector to unit length in place. Zero vectors are left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_model_mapping() {
        let (model, dim) = builtin_model("all-MiniLM-L6-v2").unwrap();
        assert!(matches!(model, EmbeddingModel::AllMiniLML6V2));
        assert_eq!(dim, 384);

        assert!(builtin_model("no-such-model").is_err());
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_embedding_result_len() {
        let result = EmbeddingResult::new(vec![vec![0.1; 4], vec![0.2; 4]], 4);
        assert_eq!(result.len(), 2);
        assert!(!result.is_empty());
    }
}
