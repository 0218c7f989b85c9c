//! # counsel-ai-retriever
//!
//! Retrieval-augmented answering over uploaded legal documents.
//!
//! The pipeline: a document is chunked and embedded
//! ([`retrieval::DocumentIndexer`]), stored in a vector index
//! ([`vector_store::VectorStore`]), retrieved per query with multi-query
//! merging ([`retrieval::RetrievalEngine`]), folded into a prompt together
//! with bounded conversation history ([`conversation::ConversationStore`]),
//! and answered by a language-model collaborator ([`llm::LlmClient`]). The
//! [`chat::ChatService`] ties the stages together.
//!
//! Documents are always session-scoped: identifiers written to the index
//! carry the owning session, and retrieval never crosses sessions.

pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod retrieval;
pub mod vector_store;

pub use chat::{AnalysisKind, AnalysisOutcome, ChatOutcome, ChatService};
pub use config::RetrieverConfig;
pub use conversation::ConversationStore;
pub use error::RetrieverError;
pub use retrieval::{DocumentIndexer, RetrievalEngine, ScopedDocumentId};
