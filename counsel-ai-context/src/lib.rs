//! # counsel-ai-context
//!
//! Text chunking and prompt assembly for the counsel-ai retrieval pipeline.
//!
//! This crate owns the two pure-computation stages of the pipeline:
//!
//! - [`text`]: splits raw document text into overlapping word windows with
//!   deterministic identifiers, the unit of embedding and retrieval.
//! - [`prompt`]: formats retrieved sections (with relevance tiers) and
//!   bounded conversation history into a single prompt body for the
//!   language-model collaborator.
//!
//! Both modules are side-effect free and synchronous; everything that talks
//! to the network lives in `counsel-ai-retriever`.

pub mod prompt;
pub mod text;

pub use prompt::{
    HistoryEntry, HistoryWindow, MessageRole, PromptAssembler, RelevanceThresholds, RelevanceTier,
    ScoredSection,
};
pub use text::{ChunkError, DocumentChunk, DocumentChunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
