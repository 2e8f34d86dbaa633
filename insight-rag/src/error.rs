//! Error types for the `insight-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while processing articles or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// Operator input was rejected before any work started.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A URL field could not be parsed as an absolute http(s) URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending input, trimmed.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },

    /// Fetching or extracting a page failed.
    #[error("Fetch error ({url}): {message}")]
    Fetch {
        /// The URL being loaded.
        url: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model call failed or returned nothing usable.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The language model backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The index could not be built or queried with the given input.
    #[error("Index error: {0}")]
    Index(String),

    /// No index has been persisted yet at the configured path.
    #[error("No index available at {}; process some URLs first", path.display())]
    IndexNotFound {
        /// Where the index was expected.
        path: PathBuf,
    },

    /// The stored index was embedded with a different model than the one
    /// configured now, so its vectors cannot be compared with the question's.
    #[error(
        "Index was built with embedding model '{indexed}' but '{configured}' is configured; \
         process the URLs again to rebuild it"
    )]
    EmbeddingModelMismatch {
        /// Model recorded in the index file.
        indexed: String,
        /// Model of the current embedding provider.
        configured: String,
    },

    /// The persisted index exists but could not be decoded.
    #[error("Corrupt index at {}: {message}", path.display())]
    CorruptIndex {
        /// The file that failed to decode.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure while persisting the index.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether the error was caused by operator input rather than a backend.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidUrl { .. })
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Fetch { .. } => "fetch",
            Self::Embedding { .. } => "embedding",
            Self::Generation { .. } => "generation",
            Self::Index(_) => "index",
            Self::IndexNotFound { .. } => "index_not_found",
            Self::EmbeddingModelMismatch { .. } => "embedding_model_mismatch",
            Self::CorruptIndex { .. } => "corrupt_index",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
