//! Integration tests covering the happy path through the retrieval pipeline:
//! store a document, retrieve its relevant chunks, hold a grounded
//! conversation, and clean up. Everything runs against the in-memory store
//! with a deterministic embedder, so results are exact.

use anyhow::Result;
use async_trait::async_trait;
use counsel_ai_context::prompt::PromptAssembler;
use counsel_ai_context::text::DocumentChunker;
use counsel_ai_embed::provider::{EmbeddingProvider, EmbeddingResult};
use counsel_ai_embed::NormalizedEmbedder;
use counsel_ai_retriever::chat::ChatService;
use counsel_ai_retriever::conversation::ConversationStore;
use counsel_ai_retriever::llm::LlmClient;
use counsel_ai_retriever::retrieval::{DocumentIndexer, RetrievalEngine};
use counsel_ai_retriever::vector_store::memory::InMemoryVectorStore;
use counsel_ai_retriever::vector_store::VectorStore;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Two-axis embedder: counts of "alpha" and "bravo" in the text. Chunks and
/// queries dominated by the same word land close together.
struct TwoWordEmbedder;

fn two_word_vector(text: &str) -> Vec<f32> {
    let alpha = text.split_whitespace().filter(|w| *w == "alpha").count() as f32;
    let bravo = text.split_whitespace().filter(|w| *w == "bravo").count() as f32;
    if alpha == 0.0 && bravo == 0.0 {
        vec![1.0, 1.0]
    } else {
        vec![alpha, bravo]
    }
}

#[async_trait]
impl EmbeddingProvider for TwoWordEmbedder {
    async fn embed_text(&self, text: &str) -> counsel_ai_embed::Result<Vec<f32>> {
        Ok(two_word_vector(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> counsel_ai_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| two_word_vector(t)).collect(),
            2,
        ))
    }

    fn embedding_dimension(&self) -> usize {
        2
    }

    fn provider_name(&self) -> &str {
        "two-word"
    }
}

struct EchoLlm;

#[async_trait]
impl LlmClient for EchoLlm {
    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
        Ok(format!("answered from a prompt of {} chars", prompt.len()))
    }
}

fn embedder() -> NormalizedEmbedder {
    NormalizedEmbedder::new(Arc::new(TwoWordEmbedder), 2)
}

/// 1000 words: the first half repeats "alpha", the second half "bravo".
fn two_topic_document() -> String {
    let mut words = Vec::with_capacity(1000);
    words.extend(std::iter::repeat_n("alpha", 500));
    words.extend(std::iter::repeat_n("bravo", 500));
    words.join(" ")
}

fn indexer(store: Arc<InMemoryVectorStore>) -> DocumentIndexer {
    DocumentIndexer::new(store, embedder(), DocumentChunker::new(500, 100).unwrap())
}

#[tokio::test]
async fn test_store_then_retrieve_ranks_matching_topic_first() -> Result<()> {
    let store = Arc::new(InMemoryVectorStore::new());
    let stored = indexer(store.clone())
        .store_document("s1", "contract", &two_topic_document(), BTreeMap::new())
        .await?;
    assert_eq!(stored.document_id, "s1_contract");
    assert_eq!(stored.chunk_count, 2);
    assert_eq!(stored.vectors_written, 2);

    let engine = RetrievalEngine::new(store, embedder());
    let chunks = engine.retrieve("s1", "contract", "bravo", &[], 5).await?;

    assert_eq!(chunks.len(), 2);
    // The second chunk is pure "bravo" plus overlap; it wins for that query.
    assert_eq!(chunks[0].metadata.chunk_index, 1);
    assert!(chunks[0].score > chunks[1].score);
    Ok(())
}

#[tokio::test]
async fn test_document_info_reflects_stored_chunks() -> Result<()> {
    let store = Arc::new(InMemoryVectorStore::new());
    let indexer = indexer(store);
    indexer
        .store_document("s1", "contract", &two_topic_document(), BTreeMap::new())
        .await?;

    let info = indexer.document_info("s1", "contract").await?.unwrap();
    assert_eq!(info.chunk_count, 2);
    assert_eq!(info.total_words, 500 + 600);

    assert!(indexer.document_info("s1", "other").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_sessions_cannot_see_each_others_documents() -> Result<()> {
    let store = Arc::new(InMemoryVectorStore::new());
    indexer(store.clone())
        .store_document("s1", "contract", &two_topic_document(), BTreeMap::new())
        .await?;

    let engine = RetrievalEngine::new(store, embedder());
    let other_session = engine.retrieve("s2", "contract", "alpha", &[], 5).await?;
    assert!(other_session.is_empty());

    let owner = engine.retrieve("s1", "contract", "alpha", &[], 5).await?;
    assert!(!owner.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_document_removes_all_vectors() -> Result<()> {
    let store = Arc::new(InMemoryVectorStore::new());
    let indexer = indexer(store.clone());
    indexer
        .store_document("s1", "contract", &two_topic_document(), BTreeMap::new())
        .await?;
    assert_eq!(store.describe().await?.total_vectors, 2);

    let removed = indexer.delete_document("s1", "contract").await?;
    assert_eq!(removed, 2);
    assert_eq!(store.describe().await?.total_vectors, 0);

    // Deleting again is not an error.
    assert_eq!(indexer.delete_document("s1", "contract").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_document_stores_nothing() -> Result<()> {
    let store = Arc::new(InMemoryVectorStore::new());
    let stored = indexer(store.clone())
        .store_document("s1", "blank", "   \n  ", BTreeMap::new())
        .await?;
    assert_eq!(stored.chunk_count, 0);
    assert_eq!(store.describe().await?.total_vectors, 0);
    Ok(())
}

#[tokio::test]
async fn test_grounded_conversation_round_trip() -> Result<()> {
    let store = Arc::new(InMemoryVectorStore::new());
    indexer(store.clone())
        .store_document("s1", "contract", &two_topic_document(), BTreeMap::new())
        .await?;

    let service = ChatService::new(
        RetrievalEngine::new(store, embedder()),
        ConversationStore::new(),
        Arc::new(EchoLlm),
        PromptAssembler::default(),
        5,
        20,
    );

    let first = service
        .chat("s1", "tell me about alpha", Some("contract"), true)
        .await?;
    assert!(first.used_rag);
    assert_eq!(first.conversation_turn, 1);
    assert!(first.chunks_retrieved > 0);

    let second = service
        .chat("s1", "and what about bravo", Some("contract"), true)
        .await?;
    assert_eq!(second.conversation_turn, 2);

    let history = service.conversations().history("s1");
    assert_eq!(history.len(), 4);

    assert!(service.conversations().clear("s1"));
    assert!(service.conversations().history("s1").is_empty());
    Ok(())
}
