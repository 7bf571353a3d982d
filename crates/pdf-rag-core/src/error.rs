//! Error taxonomy for the ingestion and answering pipeline.
//!
//! Every stage either succeeds completely or fails the whole operation
//! with one of these variants. Callers map them onto transport-level
//! responses through [`RagError::category`].
//!
//! | Variant | Category |
//! |---------|----------|
//! | `EmptyDocument`, `NoChunksProduced`, `Extraction`, `InvalidRequest` | bad input |
//! | `InvalidChunking`, `DimensionMismatch`, `Configuration` | configuration |
//! | `EmbeddingProvider`, `GenerationProvider`, `VectorStore` | upstream |
//! | `ProvisioningTimeout` | upstream timeout |

use thiserror::Error;

/// Broad grouping of a [`RagError`], used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller supplied something unusable (4xx).
    BadInput,
    /// The service itself is misconfigured (500).
    Configuration,
    /// A collaborator (embedding, chat, vector store) failed (502).
    Upstream,
    /// A collaborator did not become ready in time (504).
    Timeout,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RagError {
    #[error("document contains no extractable text")]
    EmptyDocument,

    #[error("chunking produced no non-empty chunks")]
    NoChunksProduced,

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap} (need chunk_size > 0 and overlap < chunk_size)")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("dimension mismatch: collection expects {expected}, embeddings have {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("generation provider error: {0}")]
    GenerationProvider(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("collection '{collection}' not ready after {waited_secs}s")]
    ProvisioningTimeout { collection: String, waited_secs: u64 },
}

impl RagError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RagError::EmptyDocument
            | RagError::NoChunksProduced
            | RagError::Extraction(_)
            | RagError::InvalidRequest(_) => ErrorCategory::BadInput,
            RagError::InvalidChunking { .. }
            | RagError::DimensionMismatch { .. }
            | RagError::Configuration(_) => ErrorCategory::Configuration,
            RagError::EmbeddingProvider(_)
            | RagError::GenerationProvider(_)
            | RagError::VectorStore(_) => ErrorCategory::Upstream,
            RagError::ProvisioningTimeout { .. } => ErrorCategory::Timeout,
        }
    }

    /// Machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::EmptyDocument => "empty_document",
            RagError::NoChunksProduced => "no_chunks_produced",
            RagError::Extraction(_) => "extraction_failed",
            RagError::InvalidRequest(_) => "bad_request",
            RagError::InvalidChunking { .. } => "invalid_chunking",
            RagError::DimensionMismatch { .. } => "dimension_mismatch",
            RagError::Configuration(_) => "configuration",
            RagError::EmbeddingProvider(_) => "embedding_provider",
            RagError::GenerationProvider(_) => "generation_provider",
            RagError::VectorStore(_) => "vector_store",
            RagError::ProvisioningTimeout { .. } => "provisioning_timeout",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::BadInput
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_client_errors() {
        assert!(RagError::EmptyDocument.is_client_error());
        assert!(RagError::NoChunksProduced.is_client_error());
        assert!(!RagError::EmbeddingProvider("boom".into()).is_client_error());
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            RagError::ProvisioningTimeout {
                collection: "idx".into(),
                waited_secs: 120
            }
            .category(),
            ErrorCategory::Timeout
        );
        assert_eq!(
            RagError::VectorStore("down".into()).category(),
            ErrorCategory::Upstream
        );
        assert_eq!(
            RagError::InvalidChunking {
                chunk_size: 0,
                overlap: 0
            }
            .category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_display_includes_detail() {
        let err = RagError::DimensionMismatch {
            expected: 1536,
            actual: 768,
        };
        let msg = err.to_string();
        assert!(msg.contains("1536"));
        assert!(msg.contains("768"));
    }
}
