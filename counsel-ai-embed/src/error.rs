//! Error types for the embedding system

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// The variants split along the retry boundary the rest of the pipeline
/// relies on: [`EmbedError::DimensionMismatch`] and
/// [`EmbedError::InvalidConfig`] are configuration errors that no retry can
/// fix, [`EmbedError::EmptyInput`] is an argument error rejected before any
/// model call, and the remaining variants wrap runtime failures from the
/// model or the async runtime.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// A normalized embedding did not come out at the configured target
    /// dimension. Fatal: the vector index would reject or corrupt the data.
    #[error("embedding dimension {actual} does not match configured target {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Empty or whitespace-only input text, rejected before any model call
    #[error("cannot embed empty text")]
    EmptyInput,

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Configuration validation failure with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
