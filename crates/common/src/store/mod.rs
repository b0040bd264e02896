//! Vector store abstraction
//!
//! Two implementations behind one trait:
//! - `QdrantStore`: the external ANN store, spoken to over its REST API
//! - `InMemoryIndex`: exact cosine scan used by tests and local tooling
//!
//! Cosine similarity is the sole metric; it is fixed when a collection is
//! created and cannot change afterwards.

mod memory;
mod qdrant;

pub use memory::InMemoryIndex;
pub use qdrant::QdrantStore;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted unit: id + vector + flat payload. The payload never contains
/// the vector itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// A search hit, ordered by score descending; ties keep store return order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// Equality predicate over a payload field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: String,
    pub value: Value,
}

/// Top-k cosine search parameters
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub vector: Vec<f32>,

    /// Upper bound on result count; fewer are returned when the collection
    /// has fewer matching points
    pub limit: usize,

    /// Drop hits scoring below this
    pub score_threshold: Option<f32>,

    /// Conjunction of equality predicates over payload fields
    pub filters: Vec<FieldCondition>,

    /// Ids never returned (self-exclusion for "similar to X" flows)
    pub exclude_ids: Vec<u64>,
}

impl SearchQuery {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            limit,
            score_threshold: None,
            filters: Vec::new(),
            exclude_ids: Vec::new(),
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(FieldCondition {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn exclude(mut self, id: u64) -> Self {
        self.exclude_ids.push(id);
        self
    }
}

/// Common trait for vector store backends
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// True when the named collection exists
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Drop a collection and all of its points
    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Create a collection with the given dimensionality (cosine distance)
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Insert or replace points, waiting for the write to commit
    async fn upsert(&self, collection: &str, points: &[IndexPoint]) -> Result<()>;

    /// Top-k cosine search
    async fn search(&self, collection: &str, query: SearchQuery) -> Result<Vec<ScoredPoint>>;
}
