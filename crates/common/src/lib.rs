//! lai-rag Common Library
//!
//! Shared code for the lai-rag indexing and retrieval services including:
//! - Domain record types (pedidos / recursos) and tabular loading
//! - Embedding provider abstraction
//! - Precomputed-embedding cache
//! - Vector store abstraction and Qdrant client
//! - Error types and handling
//! - Configuration management

pub mod cache;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use store::VectorIndex;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Separator joining the summary and detail columns into the embedded sentence
pub const SENTENCE_SEPARATOR: &str = " <SEP> ";

/// Placeholder rendered for fields absent from a record
pub const NOT_AVAILABLE: &str = "N/A";
