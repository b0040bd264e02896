//! Exact in-memory vector index
//!
//! Brute-force cosine scan with the same contract as the Qdrant client.
//! Used by tests and local tooling where standing up a store is overkill.

use super::{IndexPoint, ScoredPoint, SearchQuery, VectorIndex};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Collection {
    dimension: usize,
    /// Insertion order preserved; search ties keep this order
    points: Vec<IndexPoint>,
}

#[derive(Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a collection (test helper)
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .expect("index lock poisoned")
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }

    fn matches_filters(point: &IndexPoint, query: &SearchQuery) -> bool {
        if query.exclude_ids.contains(&point.id) {
            return false;
        }
        query
            .filters
            .iter()
            .all(|cond| point.payload.get(&cond.field) == Some(&cond.value))
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self
            .collections
            .read()
            .expect("index lock poisoned")
            .contains_key(collection))
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.collections
            .write()
            .expect("index lock poisoned")
            .remove(collection);
        Ok(())
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let mut collections = self.collections.write().expect("index lock poisoned");
        collections.insert(
            collection.to_string(),
            Collection {
                dimension,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[IndexPoint]) -> Result<()> {
        let mut collections = self.collections.write().expect("index lock poisoned");
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| AppError::StoreUnavailable {
                message: format!("collection {} does not exist", collection),
            })?;

        for point in points {
            if point.vector.len() != coll.dimension {
                return Err(AppError::DataIntegrity {
                    message: format!(
                        "point {} has dimension {} (collection expects {})",
                        point.id,
                        point.vector.len(),
                        coll.dimension
                    ),
                });
            }
            match coll.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point.clone(),
                None => coll.points.push(point.clone()),
            }
        }
        Ok(())
    }

    async fn search(&self, collection: &str, query: SearchQuery) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().expect("index lock poisoned");
        let coll = collections
            .get(collection)
            .ok_or_else(|| AppError::StoreUnavailable {
                message: format!("collection {} does not exist", collection),
            })?;

        let mut hits: Vec<ScoredPoint> = coll
            .points
            .iter()
            .filter(|p| Self::matches_filters(p, &query))
            .map(|p| ScoredPoint {
                id: p.id,
                score: Self::cosine(&p.vector, &query.vector),
                payload: p.payload.clone(),
            })
            .filter(|hit| query.score_threshold.map_or(true, |t| hit.score >= t))
            .collect();

        // Stable sort keeps insertion order on ties
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(query.limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: u64, vector: Vec<f32>, context: Option<&str>) -> IndexPoint {
        let mut payload = serde_json::Map::new();
        if let Some(ctx) = context {
            payload.insert("context".into(), json!(ctx));
        }
        IndexPoint { id, vector, payload }
    }

    #[tokio::test]
    async fn test_search_orders_by_cosine() {
        let index = InMemoryIndex::new();
        index.create_collection("c", 2).await.unwrap();
        index
            .upsert(
                "c",
                &[
                    point(1, vec![0.0, 1.0], None),
                    point(2, vec![1.0, 0.0], None),
                    point(3, vec![0.7, 0.7], None),
                ],
            )
            .await
            .unwrap();

        let hits = index
            .search("c", SearchQuery::new(vec![1.0, 0.0], 2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 2);
        assert_eq!(hits[1].id, 3);
    }

    #[tokio::test]
    async fn test_filters_and_exclusions() {
        let index = InMemoryIndex::new();
        index.create_collection("c", 1).await.unwrap();
        index
            .upsert(
                "c",
                &[
                    point(1, vec![1.0], Some("orgao_demandado")),
                    point(2, vec![1.0], Some("orgao_julgador")),
                    point(3, vec![1.0], Some("orgao_julgador")),
                ],
            )
            .await
            .unwrap();

        let query = SearchQuery::new(vec![1.0], 10)
            .filter_eq("context", "orgao_julgador")
            .exclude(3);
        let hits = index.search("c", query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_point() {
        let index = InMemoryIndex::new();
        index.create_collection("c", 1).await.unwrap();
        index.upsert("c", &[point(1, vec![1.0], None)]).await.unwrap();
        index
            .upsert("c", &[point(1, vec![-1.0], None)])
            .await
            .unwrap();
        assert_eq!(index.len("c"), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let index = InMemoryIndex::new();
        index.create_collection("c", 2).await.unwrap();
        let err = index
            .upsert("c", &[point(1, vec![1.0], None)])
            .await
            .unwrap_err();
        assert!(err.is_integrity());
    }

    #[tokio::test]
    async fn test_threshold_prunes_low_scores() {
        let index = InMemoryIndex::new();
        index.create_collection("c", 2).await.unwrap();
        index
            .upsert(
                "c",
                &[point(1, vec![1.0, 0.0], None), point(2, vec![0.0, 1.0], None)],
            )
            .await
            .unwrap();

        let hits = index
            .search(
                "c",
                SearchQuery::new(vec![1.0, 0.0], 10).with_threshold(Some(0.5)),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }
}
