//! Retrieval functionality: document ingestion and multi-query search.

pub mod document_index;
pub mod engine;

pub use document_index::{DocumentIndexer, DocumentInfo, ScopedDocumentId, StoredDocument};
pub use engine::{QuerySource, RetrievalEngine, RetrievedChunk};
