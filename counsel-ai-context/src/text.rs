//! Word-window chunking for legal documents.
//!
//! Uploaded contracts are split into overlapping windows of whitespace-delimited
//! words before embedding. Overlap keeps clause boundaries from being cut in half:
//! a sentence that straddles two windows appears, complete, in at least one of
//! them. Each window carries a deterministic identifier derived from its content
//! and position, so re-chunking the same document reproduces the same ids.
//!
//! The chunker is a pure function of `(text, chunk_size, overlap)`: no I/O, no
//! clock, no randomness. Retrieval and storage layers build on that determinism.
//!
//! # Example
//!
//! ```
//! use counsel_ai_context::text::DocumentChunker;
//!
//! let chunker = DocumentChunker::new(100, 20).unwrap();
//! let chunks = chunker.chunk("one two three four five");
//!
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_index, 0);
//! assert_eq!(chunks[0].word_count, 5);
//! assert_eq!(chunks[0].start_word, 0);
//! assert_eq!(chunks[0].end_word, 5);
//! ```

use serde::Serialize;

/// Default window size in words, matching the production chunking profile
/// for contract-length documents.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap in words between consecutive windows.
pub const DEFAULT_OVERLAP: usize = 100;

/// Number of leading characters of a chunk that participate in its identifier.
const ID_PREFIX_CHARS: usize = 100;

/// Errors from chunker construction.
///
/// Both variants are argument errors: they are raised before any text is
/// touched, and retrying with the same arguments will fail the same way.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// `chunk_size` must be at least one word.
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    /// `overlap >= chunk_size` would make the stride non-positive and the
    /// window loop non-terminating.
    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    InvalidOverlap { chunk_size: usize, overlap: usize },
}

/// A single overlapping word-window extracted from a document.
///
/// `start_word..end_word` is the half-open word range this chunk covers in the
/// original document. `chunk_index` is the stride step number (0-based), not a
/// byte offset. The `id` is a hex-encoded blake3 hash of the first
/// 100 characters of the chunk text together with `start_word`, so identical
/// content at the same offset always reproduces the same id.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub chunk_index: usize,
    pub word_count: usize,
    pub start_word: usize,
    pub end_word: usize,
}

/// Splits document text into overlapping fixed-size word windows.
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl DocumentChunker {
    /// Create a chunker producing windows of `chunk_size` words that advance
    /// by `chunk_size - overlap` words per step.
    ///
    /// Fails with [`ChunkError::InvalidOverlap`] when `overlap >= chunk_size`
    /// (the stride would be zero or negative) and with
    /// [`ChunkError::ZeroChunkSize`] when `chunk_size == 0`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::InvalidOverlap {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Words each window advances relative to the previous one.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split `text` into overlapping word windows.
    ///
    /// Window starts advance by [`stride`](Self::stride). The final window
    /// always ends exactly at the last word: when the tail left beyond a
    /// window's nominal end is shorter than one full stride, that tail is
    /// folded into the window rather than emitted as a near-duplicate
    /// trailing fragment. Empty (or whitespace-only) text yields an empty
    /// vector, not an error.
    pub fn chunk(&self, text: &str) -> Vec<DocumentChunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let stride = self.stride();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let nominal_end = start + self.chunk_size;
            let is_final = nominal_end + stride > words.len();
            let end = if is_final { words.len() } else { nominal_end };

            let chunk_text = words[start..end].join(" ");
            chunks.push(DocumentChunk {
                id: chunk_id(&chunk_text, start),
                text: chunk_text,
                chunk_index: chunks.len(),
                word_count: end - start,
                start_word: start,
                end_word: end,
            });

            if is_final {
                break;
            }
            start += stride;
        }

        chunks
    }
}

/// Deterministic chunk identifier from the content prefix and word offset.
///
/// Only the first [`ID_PREFIX_CHARS`] characters participate, so very long
/// windows hash quickly; the offset disambiguates repeated boilerplate that
/// appears at multiple positions in the same document.
fn chunk_id(chunk_text: &str, start_word: usize) -> String {
    let prefix: String = chunk_text.chars().take(ID_PREFIX_CHARS).collect();
    let mut hasher = blake3::Hasher::new();
    hasher.update(prefix.as_bytes());
    hasher.update(start_word.to_le_bytes().as_slice());
    hasher.finalize().to_hex().to_string()
}
