//! Document ingestion: chunk, embed, and upsert into the vector index.
//!
//! Every document belongs to exactly one session. Identifiers stored in the
//! index are session-scoped so that retrieval for one session can never see
//! another session's documents, even when two sessions upload the same file
//! under the same name.

use crate::vector_store::{ChunkMetadata, VectorRecord, VectorStore};
use anyhow::{Context, Result};
use counsel_ai_context::text::DocumentChunker;
use counsel_ai_embed::NormalizedEmbedder;
use std::collections::BTreeMap;
use std::sync::Arc;

/// How many vectors the document-info probe inspects.
const INFO_PROBE_TOP_K: usize = 50;

/// A document id qualified by its owning session.
///
/// Rendered as `{session_id}_{document_id}`; this is the only form ever
/// written to or queried from the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedDocumentId(String);

impl ScopedDocumentId {
    pub fn new(session_id: &str, document_id: &str) -> Self {
        Self(format!("{session_id}_{document_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopedDocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of storing one document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredDocument {
    pub document_id: String,
    pub chunk_count: usize,
    pub vectors_written: usize,
}

/// Summary of an already-stored document, reconstructed from the index.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub chunk_count: usize,
    pub total_words: usize,
    pub created_at: Option<String>,
}

/// Chunks documents, embeds the chunks, and writes them to the index.
pub struct DocumentIndexer {
    store: Arc<dyn VectorStore>,
    embedder: NormalizedEmbedder,
    chunker: DocumentChunker,
}

impl DocumentIndexer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: NormalizedEmbedder,
        chunker: DocumentChunker,
    ) -> Self {
        Self {
            store,
            embedder,
            chunker,
        }
    }

    /// Chunk `text`, embed every chunk, and upsert the vectors.
    ///
    /// Empty or whitespace-only text stores nothing and succeeds with a zero
    /// chunk count. `extra` metadata values are stored alongside each chunk,
    /// subject to the store's size caps.
    pub async fn store_document(
        &self,
        session_id: &str,
        document_id: &str,
        text: &str,
        extra: BTreeMap<String, String>,
    ) -> Result<StoredDocument> {
        let scoped = ScopedDocumentId::new(session_id, document_id);
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            tracing::info!(document_id = %scoped, "document produced no chunks, nothing stored");
            return Ok(StoredDocument {
                document_id: scoped.0,
                chunk_count: 0,
                vectors_written: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedded = self
            .embedder
            .embed_texts(&texts)
            .await
            .context("embedding document chunks failed")?;

        let created_at = chrono::Utc::now().to_rfc3339();
        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embedded.embeddings)
            .map(|(chunk, values)| VectorRecord {
                id: format!("{scoped}_{}", chunk.id),
                values,
                metadata: ChunkMetadata {
                    document_id: scoped.0.clone(),
                    chunk_id: chunk.id.clone(),
                    chunk_index: chunk.chunk_index,
                    text: chunk.text.clone(),
                    word_count: chunk.word_count,
                    start_word: chunk.start_word,
                    end_word: chunk.end_word,
                    created_at: created_at.clone(),
                    extra: extra.clone(),
                }
                .capped(),
            })
            .collect();

        let vectors_written = self
            .store
            .upsert(records)
            .await
            .context("storing document vectors failed")?;

        tracing::info!(
            document_id = %scoped,
            chunks = chunks.len(),
            vectors = vectors_written,
            "stored document"
        );
        Ok(StoredDocument {
            document_id: scoped.0,
            chunk_count: chunks.len(),
            vectors_written,
        })
    }

    /// Look up a stored document by probing the index with a zero vector.
    /// Returns `None` when no chunks exist for it.
    pub async fn document_info(
        &self,
        session_id: &str,
        document_id: &str,
    ) -> Result<Option<DocumentInfo>> {
        let scoped = ScopedDocumentId::new(session_id, document_id);
        let probe = vec![0.0f32; self.embedder.target_dimension()];
        let matches = self
            .store
            .query(&probe, Some(scoped.as_str()), INFO_PROBE_TOP_K, true)
            .await
            .context("document info probe failed")?;

        if matches.is_empty() {
            return Ok(None);
        }

        let total_words = matches
            .iter()
            .filter_map(|m| m.metadata.as_ref())
            .map(|m| m.word_count)
            .sum();
        let created_at = matches
            .iter()
            .filter_map(|m| m.metadata.as_ref())
            .map(|m| m.created_at.clone())
            .next();
        Ok(Some(DocumentInfo {
            document_id: scoped.0,
            chunk_count: matches.len(),
            total_words,
            created_at,
        }))
    }

    /// Remove every vector stored for the document. Returns the number of
    /// vectors removed; deleting an absent document is not an error.
    pub async fn delete_document(&self, session_id: &str, document_id: &str) -> Result<usize> {
        let scoped = ScopedDocumentId::new(session_id, document_id);
        self.store
            .delete_by_document(scoped.as_str())
            .await
            .with_context(|| format!("deleting document {scoped} failed"))
    }
}
