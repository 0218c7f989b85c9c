//! # counsel-ai-embed
//!
//! Embedding generation for the counsel-ai retrieval pipeline.
//!
//! Documents and queries are embedded with a local fastembed model
//! ([`FastEmbedProvider`]); the [`NormalizedEmbedder`] wrapper reconciles the
//! model's native output to the dimension the vector index was created with,
//! so the rest of the pipeline never sees a vector of the wrong length.
//!
//! ## Usage
//!
//! ```no_run
//! use counsel_ai_embed::{EmbedConfig, FastEmbedProvider, NormalizedEmbedder};
//! use std::sync::Arc;
//!
//! # async fn example() -> counsel_ai_embed::Result<()> {
//! let config = EmbedConfig::default();
//! let target = config.target_dimension;
//! let provider = FastEmbedProvider::create(config).await?;
//! let embedder = NormalizedEmbedder::new(Arc::new(provider), target);
//!
//! let vector = embedder.embed_text("What does the indemnity clause cover?").await?;
//! assert_eq!(vector.len(), target);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod normalizer;
pub mod provider;

pub use config::{DEFAULT_TARGET_DIMENSION, EmbedConfig};
pub use error::{EmbedError, Result};
pub use normalizer::NormalizedEmbedder;
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider, l2_normalize};
