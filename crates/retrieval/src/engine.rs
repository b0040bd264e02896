//! Search engine
//!
//! Thin semantic-search layer over the two collections: embeds the query text
//! once, then runs top-k cosine search through the `VectorIndex` seam. The
//! configured score threshold applies to every search issued here.

use lai_common::errors::Result;
use lai_common::models::RequestRecord;
use lai_common::store::{ScoredPoint, SearchQuery, VectorIndex};
use lai_common::Embedder;
use std::sync::Arc;
use tracing::debug;

pub struct SearchEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorIndex>,
    requests_collection: String,
    appeals_collection: String,
    score_threshold: Option<f32>,
}

impl SearchEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorIndex>,
        requests_collection: impl Into<String>,
        appeals_collection: impl Into<String>,
        score_threshold: Option<f32>,
    ) -> Self {
        Self {
            embedder,
            store,
            requests_collection: requests_collection.into(),
            appeals_collection: appeals_collection.into(),
            score_threshold,
        }
    }

    /// Top-k pedidos semantically closest to the query text
    pub async fn search_requests(&self, text: &str, limit: usize) -> Result<Vec<ScoredPoint>> {
        let vector = self.embedder.embed(text).await?;
        let query = SearchQuery::new(vector, limit).with_threshold(self.score_threshold);
        let hits = self.store.search(&self.requests_collection, query).await?;
        debug!(collection = %self.requests_collection, limit, hits = hits.len(), "Request search");
        Ok(hits)
    }

    /// Top-k recursos semantically closest to the query text
    pub async fn search_appeals(&self, text: &str, limit: usize) -> Result<Vec<ScoredPoint>> {
        let vector = self.embedder.embed(text).await?;
        let query = SearchQuery::new(vector, limit).with_threshold(self.score_threshold);
        let hits = self.store.search(&self.appeals_collection, query).await?;
        debug!(collection = %self.appeals_collection, limit, hits = hits.len(), "Appeal search");
        Ok(hits)
    }

    /// Pedidos similar to an anchor pedido, the anchor itself excluded.
    /// Uses the anchor's indexed sentence as the query text so the result
    /// ranking matches what the index itself would consider closest.
    pub async fn similar_requests(
        &self,
        anchor: &RequestRecord,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let vector = self.embedder.embed(&anchor.sentence).await?;
        let query = SearchQuery::new(vector, limit)
            .with_threshold(self.score_threshold)
            .exclude(anchor.request_id);
        self.store.search(&self.requests_collection, query).await
    }
}
