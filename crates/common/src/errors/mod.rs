//! Error types for lai-rag services
//!
//! Provides a shared error taxonomy with:
//! - Distinct error types for different failure modes
//! - Clear separation between fatal (integrity) and transient (store) failures
//! - Conversions from the underlying I/O, HTTP and serialization errors

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Embedding/metadata misalignment or a cache missing required fields.
    /// Aborts the operation entirely; no partial artifact may be left behind.
    #[error("Data integrity error: {message}")]
    DataIntegrity { message: String },

    /// Exact-ID lookups with no match
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Connectivity or timeout against the vector store
    #[error("Vector store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Embedding provider failure
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Embedding timeout after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Transient failures worth one batch-level retry on the build path
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StoreUnavailable { .. }
                | AppError::HttpClient(_)
                | AppError::EmbeddingTimeout { .. }
        )
    }

    /// Failures that must abort a build before anything is written
    pub fn is_integrity(&self) -> bool {
        matches!(self, AppError::DataIntegrity { .. })
    }

    /// Shorthand for not-found lookups
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }
}
