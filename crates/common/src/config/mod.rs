//! Configuration management for lai-rag services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Vector store configuration
    pub store: StoreConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Source data configuration
    pub data: DataConfig,

    /// Retrieval tuning
    pub retrieval: RetrievalConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Qdrant base URL
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Optional API key
    pub api_key: Option<String>,

    /// Request timeout in seconds (store calls must never hang the caller)
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Collection holding pedido vectors
    #[serde(default = "default_requests_collection")]
    pub requests_collection: String,

    /// Collection holding recurso vectors
    #[serde(default = "default_appeals_collection")]
    pub appeals_collection: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: http, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// JSONL file with pedido rows
    #[serde(default = "default_requests_path")]
    pub requests_path: String,

    /// JSONL file with recurso rows
    #[serde(default = "default_appeals_path")]
    pub appeals_path: String,

    /// Precomputed embedding cache for pedidos
    #[serde(default = "default_requests_cache")]
    pub requests_cache: String,

    /// Precomputed embedding cache for recursos
    #[serde(default = "default_appeals_cache")]
    pub appeals_cache: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Default top-k when the caller does not specify one
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Over-fetch multiplier for the cross-entity multi-stage search
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    /// Minimum similarity score, if any
    pub score_threshold: Option<f32>,

    /// Character budget for source excerpts
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_store_url() -> String { "http://127.0.0.1:6333".to_string() }
fn default_store_timeout() -> u64 { 60 }
fn default_requests_collection() -> String { "pedidos_cgu_v1".to_string() }
fn default_appeals_collection() -> String { "recursos_cgu_v1".to_string() }
fn default_embedding_provider() -> String { "http".to_string() }
fn default_embedding_model() -> String { "intfloat/multilingual-e5-base".to_string() }
fn default_embedding_dimension() -> usize { 768 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_embedding_batch_size() -> usize { 128 }
fn default_requests_path() -> String { "data/dt_pedidos.jsonl".to_string() }
fn default_appeals_path() -> String { "data/dt_recursos.jsonl".to_string() }
fn default_requests_cache() -> String { "data/vetores/pedidos.json".to_string() }
fn default_appeals_cache() -> String { "data/vetores/recursos.json".to_string() }
fn default_top_k() -> usize { 5 }
fn default_overfetch_factor() -> usize { 5 }
fn default_excerpt_chars() -> usize { 200 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "lai-rag".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__STORE__URL=http://qdrant:6333
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get store timeout as Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// Get embedding timeout as Duration
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                url: default_store_url(),
                api_key: None,
                timeout_secs: default_store_timeout(),
                requests_collection: default_requests_collection(),
                appeals_collection: default_appeals_collection(),
            },
            embedding: EmbeddingConfig {
                provider: default_embedding_provider(),
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_embedding_retries(),
                batch_size: default_embedding_batch_size(),
            },
            data: DataConfig {
                requests_path: default_requests_path(),
                appeals_path: default_appeals_path(),
                requests_cache: default_requests_cache(),
                appeals_cache: default_appeals_cache(),
            },
            retrieval: RetrievalConfig {
                top_k: default_top_k(),
                overfetch_factor: default_overfetch_factor(),
                score_threshold: None,
                excerpt_chars: default_excerpt_chars(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                service_name: default_service_name(),
            },
        }
    }
}
