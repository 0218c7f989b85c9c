//! In-memory vector store.
//!
//! Brute-force cosine similarity over a `HashMap`. Used by tests and by the
//! CLI when no index endpoint is configured; it implements the full
//! [`VectorStore`] contract including document filtering.

use super::{IndexStats, VectorMatch, VectorRecord, VectorStore, UPSERT_BATCH_SIZE};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: Mutex<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut total = 0;
        // Batched to mirror the remote store's write pattern.
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let mut guard = self.records.lock().unwrap();
            for record in batch {
                guard.insert(record.id.clone(), record.clone());
                total += 1;
            }
        }
        Ok(total)
    }

    async fn query(
        &self,
        vector: &[f32],
        document_id: Option<&str>,
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>> {
        let guard = self.records.lock().unwrap();
        let mut matches: Vec<VectorMatch> = guard
            .values()
            .filter(|record| match document_id {
                Some(id) => record.metadata.document_id == id,
                None => true,
            })
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: include_metadata.then(|| record.metadata.clone()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let mut guard = self.records.lock().unwrap();
        let before = guard.len();
        guard.retain(|_, record| record.metadata.document_id != document_id);
        Ok(before - guard.len())
    }

    async fn describe(&self) -> Result<IndexStats> {
        let guard = self.records.lock().unwrap();
        let dimension = guard.values().next().map_or(0, |r| r.values.len());
        Ok(IndexStats {
            total_vectors: guard.len(),
            dimension,
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();

    let norm_a: f32 = a.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
