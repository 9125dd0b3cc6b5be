//! Error types for ragrepo-core.
//!
//! Callers map these onto HTTP status codes at the service boundary; within
//! the engine, degraded-success paths (no LLM credential, empty retrieval)
//! return `Ok` with a marker value rather than an error. The variants below
//! are reserved for conditions that must surface to the caller.

use thiserror::Error;

/// Top-level error type for all ragrepo-core operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Malformed request: missing/invalid fields. Maps to HTTP 400.
    #[error("validation error: {0}")]
    Validation(String),

    /// CORS origin check failed. Maps to HTTP 403.
    #[error("origin not allowed: {0}")]
    OriginNotAllowed(String),

    /// Tree listing failed on both the requested and fallback branch. Maps to HTTP 502.
    #[error("forge unavailable: {0}")]
    ForgeUnavailable(String),

    /// The vector store refused to allocate a new physical collection and no
    /// shared collection could be selected. Maps to HTTP 507.
    #[error("vector store at capacity: {0}")]
    VectorStoreCapacity(String),

    /// The embedding model is not loaded; there is no partial-write path. Maps to HTTP 500.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Vector store call failed for a reason other than capacity.
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// Generic internal error for unexpected conditions. Maps to HTTP 500.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error (model cache, config).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in ragrepo-core.
pub type RagResult<T> = Result<T, RagError>;
