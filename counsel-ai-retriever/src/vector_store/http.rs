//! HTTP client for a managed vector index.
//!
//! Speaks the REST protocol of Pinecone-style serverless indexes:
//! `/vectors/upsert`, `/query`, `/vectors/delete`, `/describe_index_stats`.
//! All requests carry the index API key in the `Api-Key` header.

use super::{
    ChunkMetadata, IndexStats, VectorMatch, VectorRecord, VectorStore, UPSERT_BATCH_SIZE,
};
use crate::error::RetrieverError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Deletions are issued in id batches of this size.
const DELETE_BATCH_SIZE: usize = 1000;

/// How many vectors one enumeration query may return. Documents are chunked
/// into far fewer vectors than this in practice.
const ENUMERATE_TOP_K: usize = 1000;

#[derive(Debug, Clone)]
pub struct HttpVectorStoreConfig {
    /// Base URL of the index, e.g. `https://my-index-abc123.svc.pinecone.io`
    pub endpoint: String,
    pub api_key: String,
    /// Optional namespace; empty string means the default namespace
    pub namespace: String,
    /// Dimension of the index, used for the zero-vector enumeration probe
    pub dimension: usize,
}

#[derive(Debug)]
pub struct HttpVectorStore {
    client: reqwest::Client,
    config: HttpVectorStoreConfig,
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<ChunkMetadata>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: usize,
    #[serde(default)]
    dimension: usize,
}

impl HttpVectorStore {
    pub fn new(config: HttpVectorStoreConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RetrieverError::MissingCredentials {
                name: "index api_key",
            }
            .into());
        }
        if config.endpoint.trim().is_empty() {
            return Err(RetrieverError::MissingCredentials {
                name: "index endpoint",
            }
            .into());
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("index returned {status} for {path}: {detail}");
        }
        response
            .json()
            .await
            .with_context(|| format!("malformed response from {path}"))
    }

    fn document_filter(document_id: &str) -> serde_json::Value {
        serde_json::json!({ "document_id": { "$eq": document_id } })
    }

    /// List every vector id stored for a document via a zero-vector probe.
    async fn enumerate_document_ids(&self, document_id: &str) -> Result<Vec<String>> {
        let probe = vec![0.0f32; self.config.dimension];
        let request = QueryRequest {
            vector: &probe,
            top_k: ENUMERATE_TOP_K,
            include_metadata: false,
            filter: Some(Self::document_filter(document_id)),
            namespace: &self.config.namespace,
        };
        let response: QueryResponse = self.post("query", &request).await?;
        Ok(response.matches.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut total = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|record| WireVector {
                        id: &record.id,
                        values: &record.values,
                        metadata: &record.metadata,
                    })
                    .collect(),
                namespace: &self.config.namespace,
            };
            let response: UpsertResponse = self
                .post("vectors/upsert", &request)
                .await
                .context("vector upsert batch failed")?;
            tracing::debug!(
                batch_size = batch.len(),
                upserted = response.upserted_count,
                "upserted vector batch"
            );
            total += response.upserted_count;
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
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            filter: document_id.map(Self::document_filter),
            namespace: &self.config.namespace,
        };
        let response: QueryResponse = self.post("query", &request).await?;
        Ok(response
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        // Serverless indexes reject metadata-filtered deletes, so enumerate
        // the ids first and delete them explicitly.
        let ids = self.enumerate_document_ids(document_id).await?;
        if ids.is_empty() {
            return Ok(0);
        }

        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            let request = DeleteRequest {
                ids: batch,
                namespace: &self.config.namespace,
            };
            let _: serde_json::Value = self
                .post("vectors/delete", &request)
                .await
                .context("vector delete batch failed")?;
        }
        tracing::info!(document_id, deleted = ids.len(), "deleted document vectors");
        Ok(ids.len())
    }

    async fn describe(&self) -> Result<IndexStats> {
        let response: StatsResponse = self
            .post("describe_index_stats", &serde_json::json!({}))
            .await?;
        Ok(IndexStats {
            total_vectors: response.total_vector_count,
            dimension: response.dimension,
        })
    }
}
