//! Qdrant REST client
//!
//! Thin wrapper over the collection and point endpoints the engine actually
//! uses. Every call carries the configured client timeout; transport errors
//! and non-2xx responses surface as `StoreUnavailable`.

use super::{IndexPoint, ScoredPoint, SearchQuery, VectorIndex};
use crate::config::StoreConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: u64,
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Map<String, Value>>,
}

impl QdrantStore {
    /// Build a client from configuration
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, collection)
    }

    async fn check(&self, response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::StoreUnavailable {
            message: format!("{} failed ({}): {}", action, status, body),
        })
    }

    fn transport(err: reqwest::Error, action: &str) -> AppError {
        AppError::StoreUnavailable {
            message: format!("{} failed: {}", action, err),
        }
    }

    /// Translate a query into the REST filter clause, if any predicate is set
    fn filter_clause(query: &SearchQuery) -> Option<Value> {
        let must: Vec<Value> = query
            .filters
            .iter()
            .map(|cond| json!({ "key": cond.field, "match": { "value": cond.value } }))
            .collect();

        let must_not: Vec<Value> = if query.exclude_ids.is_empty() {
            Vec::new()
        } else {
            vec![json!({ "has_id": query.exclude_ids })]
        };

        if must.is_empty() && must_not.is_empty() {
            return None;
        }

        let mut clause = serde_json::Map::new();
        if !must.is_empty() {
            clause.insert("must".into(), Value::Array(must));
        }
        if !must_not.is_empty() {
            clause.insert("must_not".into(), Value::Array(must_not));
        }
        Some(Value::Object(clause))
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let response = self
            .request(self.http.get(self.collection_url(collection)))
            .send()
            .await
            .map_err(|e| Self::transport(e, "collection lookup"))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => {
                self.check(response, "collection lookup").await?;
                Ok(false)
            }
        }
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let response = self
            .request(self.http.delete(self.collection_url(collection)))
            .send()
            .await
            .map_err(|e| Self::transport(e, "collection delete"))?;
        self.check(response, "collection delete").await?;
        Ok(())
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let body = json!({
            "vectors": {
                "size": dimension,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(self.http.put(self.collection_url(collection)).json(&body))
            .send()
            .await
            .map_err(|e| Self::transport(e, "collection create"))?;
        self.check(response, "collection create").await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[IndexPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let url = format!("{}/points", self.collection_url(collection));
        let body = json!({ "points": points });

        let response = self
            .request(self.http.put(url).query(&[("wait", "true")]).json(&body))
            .send()
            .await
            .map_err(|e| Self::transport(e, "upsert"))?;
        self.check(response, "upsert").await?;
        Ok(())
    }

    async fn search(&self, collection: &str, query: SearchQuery) -> Result<Vec<ScoredPoint>> {
        let url = format!("{}/points/search", self.collection_url(collection));

        let mut body = json!({
            "vector": query.vector,
            "limit": query.limit,
            "with_payload": true,
        });
        if let Some(threshold) = query.score_threshold {
            body["score_threshold"] = json!(threshold);
        }
        if let Some(filter) = Self::filter_clause(&query) {
            body["filter"] = filter;
        }

        let response = self
            .request(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(|e| Self::transport(e, "search"))?;
        let response = self.check(response, "search").await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Self::transport(e, "search decode"))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect())
    }
}
