use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the ingestion and retrieval pipelines.
///
/// Configuration errors (`UnsupportedBackend`) are fatal at startup.
/// Per-document ingestion errors are collected into the batch summary;
/// `ServiceUnavailable` and index-level `Timeout` are systemic and abort
/// the remaining batch. Retrieval errors always surface to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad text or arguments, e.g. an empty embedding input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The configured embedding backend selector is unknown or unusable.
    #[error("unsupported embedding backend: {0}")]
    UnsupportedBackend(String),

    /// The embedding call itself failed (HTTP error, malformed response).
    #[error("embedding backend failure: {0}")]
    EmbeddingBackend(String),

    /// The vector index could not be reached. Never conflated with
    /// "collection does not exist".
    #[error("vector index unavailable: {0}")]
    ServiceUnavailable(String),

    /// `create` was called on an existing collection without `recreate`.
    #[error("collection `{0}` already exists")]
    CollectionAlreadyExists(String),

    /// A query targeted a collection that was never created.
    #[error("collection `{0}` not found")]
    CollectionNotFound(String),

    /// A vector's length does not match the collection's declared dimension.
    #[error("dimension mismatch: vector has {actual}, collection `{collection}` expects {expected}")]
    DimensionMismatch {
        collection: String,
        expected: u64,
        actual: u64,
    },

    /// The upsert succeeded but the source file could not be moved to the
    /// archive directory; vector store and filesystem now disagree for
    /// this document.
    #[error("archive relocation failed for {path}: {reason}")]
    ArchiveRelocation { path: PathBuf, reason: String },

    /// A network-bound operation exceeded its configured deadline.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Filesystem failures while enumerating or reading source documents.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The generative synthesis collaborator failed or is not configured.
    #[error("synthesis failure: {0}")]
    Synthesis(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Systemic errors abort the remaining ingestion batch; everything else
    /// is attributed to the document in flight.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            PipelineError::ServiceUnavailable(_) | PipelineError::Timeout(_)
        )
    }

    /// Stable machine-readable kind, used in batch summaries and the HTTP
    /// error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "INVALID_INPUT",
            PipelineError::UnsupportedBackend(_) => "UNSUPPORTED_BACKEND",
            PipelineError::EmbeddingBackend(_) => "EMBEDDING_BACKEND",
            PipelineError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            PipelineError::CollectionAlreadyExists(_) => "COLLECTION_ALREADY_EXISTS",
            PipelineError::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
            PipelineError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            PipelineError::ArchiveRelocation { .. } => "ARCHIVE_RELOCATION",
            PipelineError::Timeout(_) => "TIMEOUT",
            PipelineError::Io { .. } => "IO",
            PipelineError::Synthesis(_) => "SYNTHESIS",
        }
    }
}
