//! Error types for docquery

use thiserror::Error;

/// Result type alias for docquery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docquery operations
#[derive(Error, Debug)]
pub enum Error {
    /// File kind has no text extractor
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File kind is supported but the file could not be read as one
    #[error("extraction error: {0}")]
    Extraction(String),

    /// The embedding model could not be loaded or failed to produce vectors
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The index store is unreachable or a transaction failed
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A vector does not have the dimension the index was built for
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reading an input file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure came from an external collaborator and may succeed
    /// if the caller tries again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingUnavailable(_) | Error::StorageUnavailable(_)
        )
    }
}
