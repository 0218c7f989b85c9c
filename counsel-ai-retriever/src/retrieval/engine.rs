//! The retrieval engine: multi-query similarity search with deduplication.
//!
//! A retrieval runs one primary query (the user's question) plus any number
//! of secondary queries (rephrasings or aspect probes). Secondary queries are
//! capped at half the primary budget and are best-effort: a failing secondary
//! narrows the result instead of failing the retrieval. Candidates are
//! deduplicated by vector id with the first sighting winning, ranked by
//! score, and cut to `top_k`.

use crate::error::RetrieverError;
use crate::retrieval::document_index::ScopedDocumentId;
use crate::vector_store::{VectorMatch, VectorStore};
use anyhow::{Context, Result};
use counsel_ai_embed::NormalizedEmbedder;
use futures::future::join_all;
use itertools::Itertools;
use std::sync::Arc;

/// Which query produced a retrieved chunk first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Primary,
    /// Index into the secondary query list.
    Secondary(usize),
}

/// One chunk surviving deduplication and ranking.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: String,
    pub score: f32,
    pub source: QuerySource,
    pub metadata: crate::vector_store::ChunkMetadata,
}

pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    embedder: NormalizedEmbedder,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn VectorStore>, embedder: NormalizedEmbedder) -> Self {
        Self { store, embedder }
    }

    /// Retrieve the `top_k` most relevant chunks of one document for a
    /// query, ranked by similarity score descending.
    ///
    /// An empty query is rejected before any embedding or network call. A
    /// document with no stored chunks yields `Ok` with an empty result.
    pub async fn retrieve(
        &self,
        session_id: &str,
        document_id: &str,
        query: &str,
        secondary_queries: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let candidates = self
            .gather(session_id, document_id, query, secondary_queries, top_k)
            .await?;
        Ok(rank_and_cut(candidates, top_k))
    }

    /// Like [`retrieve`](Self::retrieve), but the surviving chunks are
    /// reordered by their position in the document. Selection is still by
    /// score; only the presentation order changes, so analysis prompts read
    /// the document front to back.
    pub async fn retrieve_for_analysis(
        &self,
        session_id: &str,
        document_id: &str,
        query: &str,
        secondary_queries: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let mut selected = self
            .retrieve(session_id, document_id, query, secondary_queries, top_k)
            .await?;
        selected.sort_by_key(|chunk| chunk.metadata.chunk_index);
        Ok(selected)
    }

    async fn gather(
        &self,
        session_id: &str,
        document_id: &str,
        query: &str,
        secondary_queries: &[String],
        top_k: usize,
    ) -> Result<Vec<(VectorMatch, QuerySource)>> {
        if query.trim().is_empty() {
            return Err(RetrieverError::EmptyQuery.into());
        }
        let scoped = ScopedDocumentId::new(session_id, document_id);

        let query_vector = self
            .embedder
            .embed_text(query)
            .await
            .context("embedding primary query failed")?;
        let mut primary = self
            .store
            .query(&query_vector, Some(scoped.as_str()), top_k, true)
            .await
            .context("primary retrieval query failed")?;

        // Some indexes drop metadata filters for a window after an upsert.
        // An empty filtered result gets one unfiltered retry, post-filtered
        // on our side.
        if primary.is_empty() {
            primary = self.unfiltered_fallback(&query_vector, &scoped, top_k).await;
        }

        let mut candidates: Vec<(VectorMatch, QuerySource)> = primary
            .into_iter()
            .map(|m| (m, QuerySource::Primary))
            .collect();

        let secondary_top_k = (top_k / 2).max(1);
        let secondary_results = join_all(secondary_queries.iter().enumerate().map(
            |(index, secondary)| {
                let scoped = scoped.clone();
                async move {
                    let matches = self
                        .run_secondary(secondary, &scoped, secondary_top_k)
                        .await;
                    (index, matches)
                }
            },
        ))
        .await;

        for (index, matches) in secondary_results {
            candidates.extend(
                matches
                    .into_iter()
                    .map(|m| (m, QuerySource::Secondary(index))),
            );
        }
        Ok(candidates)
    }

    async fn run_secondary(
        &self,
        query: &str,
        scoped: &ScopedDocumentId,
        top_k: usize,
    ) -> Vec<VectorMatch> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let vector = match self.embedder.embed_text(query).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(query, error = %e, "secondary query embedding failed, skipping");
                return Vec::new();
            }
        };
        match self
            .store
            .query(&vector, Some(scoped.as_str()), top_k, true)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(query, error = %e, "secondary query failed, skipping");
                Vec::new()
            }
        }
    }

    async fn unfiltered_fallback(
        &self,
        query_vector: &[f32],
        scoped: &ScopedDocumentId,
        top_k: usize,
    ) -> Vec<VectorMatch> {
        tracing::debug!(document_id = %scoped, "filtered query empty, retrying unfiltered");
        match self.store.query(query_vector, None, top_k, true).await {
            Ok(matches) => matches
                .into_iter()
                .filter(|m| {
                    m.metadata
                        .as_ref()
                        .is_some_and(|meta| meta.document_id == scoped.as_str())
                })
                .collect(),
            Err(e) => {
                tracing::warn!(document_id = %scoped, error = %e, "unfiltered fallback failed");
                Vec::new()
            }
        }
    }
}

/// Deduplicate by vector id (first sighting wins), rank by score descending,
/// and keep the best `top_k`. Matches without metadata are dropped.
fn rank_and_cut(
    candidates: Vec<(VectorMatch, QuerySource)>,
    top_k: usize,
) -> Vec<RetrievedChunk> {
    let mut chunks: Vec<RetrievedChunk> = candidates
        .into_iter()
        .unique_by(|(m, _)| m.id.clone())
        .filter_map(|(m, source)| {
            let metadata = m.metadata?;
            Some(RetrievedChunk {
                id: m.id,
                score: m.score,
                source,
                metadata,
            })
        })
        .collect();

    chunks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    chunks.truncate(top_k);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::memory::InMemoryVectorStore;
    use crate::vector_store::{ChunkMetadata, IndexStats, VectorRecord};
    use async_trait::async_trait;
    use counsel_ai_embed::provider::{EmbeddingProvider, EmbeddingResult};
    use std::collections::BTreeMap;

    /// Maps a few known words onto fixed 2-d directions so similarity
    /// ordering is predictable.
    struct KeywordEmbedder;

    fn keyword_vector(text: &str) -> Vec<f32> {
        let alpha = text.split_whitespace().filter(|w| *w == "alpha").count() as f32;
        let bravo = text.split_whitespace().filter(|w| *w == "bravo").count() as f32;
        if alpha == 0.0 && bravo == 0.0 {
            vec![0.5, 0.5]
        } else {
            vec![alpha, bravo]
        }
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed_text(&self, text: &str) -> counsel_ai_embed::Result<Vec<f32>> {
            Ok(keyword_vector(text))
        }

        async fn embed_texts(
            &self,
            texts: &[String],
        ) -> counsel_ai_embed::Result<EmbeddingResult> {
            let embeddings = texts.iter().map(|t| keyword_vector(t)).collect();
            Ok(EmbeddingResult::new(embeddings, 2))
        }

        fn embedding_dimension(&self) -> usize {
            2
        }

        fn provider_name(&self) -> &str {
            "keyword"
        }
    }

    fn embedder() -> NormalizedEmbedder {
        NormalizedEmbedder::new(Arc::new(KeywordEmbedder), 2)
    }

    fn record(id: &str, document_id: &str, chunk_index: usize, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                chunk_id: id.to_string(),
                chunk_index,
                text: format!("section {chunk_index}"),
                word_count: 2,
                start_word: chunk_index * 2,
                end_word: chunk_index * 2 + 2,
                created_at: "2026-01-01T00:00:00Z".to_string(),
                extra: BTreeMap::new(),
            },
        }
    }

    async fn seeded_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .upsert(vec![
                record("v0", "s1_doc", 0, vec![1.0, 0.0]),
                record("v1", "s1_doc", 1, vec![0.0, 1.0]),
                record("v2", "s1_doc", 2, vec![0.8, 0.6]),
                record("v3", "s2_doc", 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_search() {
        let engine = RetrievalEngine::new(Arc::new(InMemoryVectorStore::new()), embedder());
        let err = engine
            .retrieve("s1", "doc", "   ", &[], 5)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetrieverError>(),
            Some(RetrieverError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_ranked_and_scoped_to_document() {
        let engine = RetrievalEngine::new(seeded_store().await, embedder());
        let chunks = engine.retrieve("s1", "doc", "alpha", &[], 10).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "v0");
        assert!(chunks.iter().all(|c| c.metadata.document_id == "s1_doc"));
        for pair in chunks.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_top_k_cap() {
        let engine = RetrievalEngine::new(seeded_store().await, embedder());
        let chunks = engine.retrieve("s1", "doc", "alpha", &[], 2).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "v0");
    }

    #[tokio::test]
    async fn test_secondary_queries_merge_and_dedup() {
        let engine = RetrievalEngine::new(seeded_store().await, embedder());
        let chunks = engine
            .retrieve("s1", "doc", "alpha", &["bravo".to_string()], 10)
            .await
            .unwrap();

        let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["v0", "v1", "v2"]);

        // v0 appears in both result sets, the primary sighting wins.
        let v0 = chunks.iter().find(|c| c.id == "v0").unwrap();
        assert_eq!(v0.source, QuerySource::Primary);
        let v1 = chunks.iter().find(|c| c.id == "v1").unwrap();
        assert_eq!(v1.source, QuerySource::Secondary(0));
    }

    #[tokio::test]
    async fn test_analysis_order_is_document_order() {
        let engine = RetrievalEngine::new(seeded_store().await, embedder());
        let chunks = engine
            .retrieve_for_analysis("s1", "doc", "bravo", &["alpha".to_string()], 10)
            .await
            .unwrap();
        let indexes: Vec<usize> = chunks.iter().map(|c| c.metadata.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_document_is_empty_not_error() {
        let engine = RetrievalEngine::new(seeded_store().await, embedder());
        let chunks = engine
            .retrieve("s1", "missing", "alpha", &[], 5)
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    /// A store whose filtered queries always come back empty, forcing the
    /// unfiltered fallback path.
    struct FilterBlindStore {
        inner: Arc<InMemoryVectorStore>,
    }

    #[async_trait]
    impl VectorStore for FilterBlindStore {
        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
            self.inner.upsert(records).await
        }

        async fn query(
            &self,
            vector: &[f32],
            document_id: Option<&str>,
            top_k: usize,
            include_metadata: bool,
        ) -> Result<Vec<VectorMatch>> {
            if document_id.is_some() {
                return Ok(Vec::new());
            }
            self.inner.query(vector, None, top_k, include_metadata).await
        }

        async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
            self.inner.delete_by_document(document_id).await
        }

        async fn describe(&self) -> Result<IndexStats> {
            self.inner.describe().await
        }
    }

    #[tokio::test]
    async fn test_fallback_post_filters_by_document() {
        let store = Arc::new(FilterBlindStore {
            inner: seeded_store().await,
        });
        let engine = RetrievalEngine::new(store, embedder());
        let chunks = engine.retrieve("s1", "doc", "alpha", &[], 10).await.unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.metadata.document_id == "s1_doc"));
        assert!(chunks.iter().all(|c| c.id != "v3"));
    }

    /// A store that fails every filtered query but still answers unfiltered
    /// ones, so primary falls back and secondaries are skipped.
    struct FailingFilterStore {
        inner: Arc<InMemoryVectorStore>,
    }

    #[async_trait]
    impl VectorStore for FailingFilterStore {
        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
            self.inner.upsert(records).await
        }

        async fn query(
            &self,
            vector: &[f32],
            document_id: Option<&str>,
            top_k: usize,
            include_metadata: bool,
        ) -> Result<Vec<VectorMatch>> {
            if document_id.is_some() {
                anyhow::bail!("filtered queries unavailable");
            }
            self.inner.query(vector, None, top_k, include_metadata).await
        }

        async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
            self.inner.delete_by_document(document_id).await
        }

        async fn describe(&self) -> Result<IndexStats> {
            self.inner.describe().await
        }
    }

    #[tokio::test]
    async fn test_secondary_failure_narrows_instead_of_failing() {
        // Filtered primary fails outright: that is a hard error. But a
        // failing secondary on top of a healthy primary only narrows.
        let store = Arc::new(FailingFilterStore {
            inner: seeded_store().await,
        });
        let engine = RetrievalEngine::new(store, embedder());
        let err = engine.retrieve("s1", "doc", "alpha", &[], 5).await;
        assert!(err.is_err());

        // Healthy primary, secondaries hitting the failing filter path is
        // covered by FilterBlindStore returning empty: the retrieval still
        // succeeds on primary results alone.
        let store = Arc::new(FilterBlindStore {
            inner: seeded_store().await,
        });
        let engine = RetrievalEngine::new(store, embedder());
        let chunks = engine
            .retrieve("s1", "doc", "alpha", &["bravo".to_string()], 5)
            .await
            .unwrap();
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_dedup_first_sighting_wins() {
        let m = |id: &str, score: f32| VectorMatch {
            id: id.to_string(),
            score,
            metadata: Some(ChunkMetadata {
                document_id: "s1_doc".to_string(),
                chunk_id: id.to_string(),
                chunk_index: 0,
                text: String::new(),
                word_count: 0,
                start_word: 0,
                end_word: 0,
                created_at: String::new(),
                extra: BTreeMap::new(),
            }),
        };
        let candidates = vec![
            (m("a", 0.9), QuerySource::Primary),
            (m("b", 0.8), QuerySource::Primary),
            (m("b", 0.95), QuerySource::Secondary(0)),
            (m("c", 0.7), QuerySource::Secondary(0)),
        ];
        let chunks = rank_and_cut(candidates, 10);
        assert_eq!(chunks.len(), 3);
        let b = chunks.iter().find(|c| c.id == "b").unwrap();
        assert_eq!(b.source, QuerySource::Primary);
        assert_eq!(b.score, 0.8);
    }

    #[test]
    fn test_matches_without_metadata_dropped() {
        let candidates = vec![(
            VectorMatch {
                id: "a".to_string(),
                score: 0.9,
                metadata: None,
            },
            QuerySource::Primary,
        )];
        assert!(rank_and_cut(candidates, 10).is_empty());
    }
}
