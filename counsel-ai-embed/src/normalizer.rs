//! Dimension reconciliation between a model's native output and the
//! configured vector index.
//!
//! The index dimension is fixed at creation time; the model in use may emit
//! wider or narrower vectors. [`NormalizedEmbedder`] wraps any
//! [`EmbeddingProvider`] and guarantees every vector it returns has exactly
//! the configured target dimension: shorter vectors are zero-padded, longer
//! vectors are truncated, and matching vectors pass through untouched.

use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult};
use std::sync::Arc;

/// An embedding provider whose output is reconciled to a fixed dimension.
#[derive(Clone)]
pub struct NormalizedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    target_dimension: usize,
    name: String,
}

impl std::fmt::Debug for NormalizedEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedEmbedder")
            .field("target_dimension", &self.target_dimension)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl NormalizedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, target_dimension: usize) -> Self {
        let name = format!("normalized:{}", inner.provider_name());
        if inner.embedding_dimension() != target_dimension {
            tracing::warn!(
                native = inner.embedding_dimension(),
                target = target_dimension,
                provider = %inner.provider_name(),
                "model dimension differs from index dimension, vectors will be padded or truncated"
            );
        }
        Self {
            inner,
            target_dimension,
            name,
        }
    }

    pub fn target_dimension(&self) -> usize {
        self.target_dimension
    }

    /// Embed a single text and reconcile it to the target dimension.
    ///
    /// Routed through the batch path so single-text and batch embedding
    /// cannot diverge.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let texts = [text.to_string()];
        let mut result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .pop()
            .ok_or(EmbedError::EmptyInput)
    }

    /// Embed a batch of texts; every returned vector has exactly
    /// `target_dimension` entries, in input order.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(Vec::new(), self.target_dimension));
        }
        let raw = self.inner.embed_texts(texts).await?;

        let mut reconciled = Vec::with_capacity(raw.embeddings.len());
        for embedding in raw.embeddings {
            reconciled.push(self.reconcile(embedding)?);
        }
        Ok(EmbeddingResult::new(reconciled, self.target_dimension))
    }

    fn reconcile(&self, mut embedding: Vec<f32>) -> Result<Vec<f32>> {
        use std::cmp::Ordering;
        match embedding.len().cmp(&self.target_dimension) {
            Ordering::Less => embedding.resize(self.target_dimension, 0.0),
            Ordering::Greater => embedding.truncate(self.target_dimension),
            Ordering::Equal => {}
        }
        if embedding.len() != self.target_dimension {
            return Err(EmbedError::DimensionMismatch {
                expected: self.target_dimension,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    pub fn provider_name(&self) -> &str {
        &self.name
    }
}
