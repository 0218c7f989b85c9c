//! Vector store abstraction for counsel-ai-retriever
//!
//! This module provides the trait-based abstraction between the retrieval
//! logic and the vector index that holds document chunk embeddings. The
//! concrete backends are an HTTP client for a managed vector index
//! ([`http::HttpVectorStore`]) and an in-memory store used for tests and
//! local experiments ([`memory::InMemoryVectorStore`]).
//!
//! ## Key Components
//!
//! - **VectorStore**: upsert, filtered similarity query, deletion, and stats
//! - **VectorRecord / VectorMatch**: the stored and returned record shapes
//! - **ChunkMetadata**: the metadata payload attached to every vector

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod http;
pub mod memory;

/// Vectors are written in batches of this size.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Stored chunk text is capped at this many characters in metadata.
pub const METADATA_TEXT_CAP: usize = 1000;

/// Extra metadata string values are capped at this many characters.
pub const METADATA_EXTRA_CAP: usize = 500;

/// Metadata stored alongside each vector.
///
/// `document_id` here is always the session-scoped form
/// (`{session_id}_{document_id}`), so one session can never retrieve
/// another session's chunks.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub chunk_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub word_count: usize,
    pub start_word: usize,
    pub end_word: usize,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ChunkMetadata {
    /// Apply the storage caps: chunk text to [`METADATA_TEXT_CAP`] chars,
    /// every extra value to [`METADATA_EXTRA_CAP`] chars.
    pub fn capped(mut self) -> Self {
        self.text = truncate_chars(&self.text, METADATA_TEXT_CAP);
        for value in self.extra.values_mut() {
            *value = truncate_chars(value, METADATA_EXTRA_CAP);
        }
        self
    }
}

fn truncate_chars(s: &str, cap: usize) -> String {
    s.chars().take(cap).collect()
}

/// A vector plus its identifier and metadata, ready to upsert.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One similarity match returned by a query.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<ChunkMetadata>,
}

/// Aggregate statistics about the index.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub dimension: usize,
}

/// Similarity search operations over the vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert records into the index. Implementations write in batches of
    /// [`UPSERT_BATCH_SIZE`] and fail on the first batch that is rejected.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize>;

    /// Query the `top_k` nearest vectors, optionally restricted to one
    /// scoped document id.
    async fn query(
        &self,
        vector: &[f32],
        document_id: Option<&str>,
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>>;

    /// Delete every vector belonging to the scoped document id. Returns the
    /// number of vectors removed.
    async fn delete_by_document(&self, document_id: &str) -> Result<usize>;

    /// Describe the index.
    async fn describe(&self) -> Result<IndexStats>;
}
