//! Error types specific to the retrieval service.

/// Errors the retrieval service raises on its own behalf.
///
/// Infrastructure failures (HTTP, embedding, serialization) travel as
/// `anyhow::Error` with context attached; these variants exist for the
/// conditions callers are expected to match on.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Query text was empty or whitespace-only. Rejected before any
    /// embedding or network call.
    #[error("query text is empty")]
    EmptyQuery,

    /// A required credential or endpoint was not configured. Fatal at
    /// startup; nothing downstream can work without it.
    #[error("missing required configuration: {name}")]
    MissingCredentials { name: &'static str },
}
