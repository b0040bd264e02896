//! Collection builder
//!
//! Builds are always full replacements: an existing collection is deleted
//! before the new one is created. Rows are chunked for memory bounding and
//! upserted in smaller batches; a failed batch is retried once, then degraded
//! to per-point upserts so a bad batch only costs the records it contained.

use lai_common::errors::{AppError, Result};
use lai_common::store::{IndexPoint, VectorIndex};
use std::sync::Arc;
use tracing::{info, warn};

/// Rows handled per chunk (memory bound)
const CHUNK_SIZE: usize = 10_000;

/// Points per upsert call (write amplification bound)
const BATCH_SIZE: usize = 500;

/// Aggregate outcome of one collection build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub collection: String,
    pub points_inserted: usize,
    pub points_failed: usize,
    pub batches_retried: usize,
}

impl BuildReport {
    /// Overall success requires zero failed points
    pub fn is_complete(&self) -> bool {
        self.points_failed == 0
    }
}

pub struct IndexBuilder {
    store: Arc<dyn VectorIndex>,
    chunk_size: usize,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(store: Arc<dyn VectorIndex>) -> Self {
        Self {
            store,
            chunk_size: CHUNK_SIZE,
            batch_size: BATCH_SIZE,
        }
    }

    /// Override the chunk/batch sizes (tests, tuning)
    pub fn with_batching(mut self, chunk_size: usize, batch_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.batch_size = batch_size.max(1);
        self
    }

    /// Build a collection from aligned rows and precomputed embeddings.
    ///
    /// Hard precondition: `rows.len() == embeddings.len()`. A mismatch aborts
    /// with `DataIntegrity` before the store is touched, leaving any previous
    /// collection as it was.
    pub async fn build<R>(
        &self,
        collection: &str,
        rows: &[R],
        embeddings: &[Vec<f32>],
        to_point: impl Fn(&R, Vec<f32>) -> IndexPoint,
    ) -> Result<BuildReport> {
        if rows.len() != embeddings.len() {
            return Err(AppError::DataIntegrity {
                message: format!(
                    "collection {}: {} metadata rows for {} embeddings",
                    collection,
                    rows.len(),
                    embeddings.len()
                ),
            });
        }

        if rows.is_empty() {
            return Err(AppError::DataIntegrity {
                message: format!("collection {}: nothing to index", collection),
            });
        }

        let dimension = embeddings[0].len();

        // Full replacement, never an incremental merge
        if self.store.collection_exists(collection).await? {
            warn!(collection = collection, "Collection exists, recreating");
            self.store.delete_collection(collection).await?;
        }

        info!(
            collection = collection,
            points = rows.len(),
            dimension = dimension,
            "Creating collection"
        );
        self.store.create_collection(collection, dimension).await?;

        let mut report = BuildReport {
            collection: collection.to_string(),
            points_inserted: 0,
            points_failed: 0,
            batches_retried: 0,
        };

        for (chunk_no, chunk) in rows
            .chunks(self.chunk_size)
            .zip(embeddings.chunks(self.chunk_size))
            .enumerate()
            .map(|(i, (r, e))| (i, r.iter().zip(e.iter())))
        {
            let points: Vec<IndexPoint> = chunk
                .map(|(row, vector)| to_point(row, vector.clone()))
                .collect();

            for batch in points.chunks(self.batch_size) {
                self.upsert_batch(collection, batch, &mut report).await;
            }

            info!(
                collection = collection,
                chunk = chunk_no + 1,
                inserted = report.points_inserted,
                failed = report.points_failed,
                "Chunk processed"
            );
        }

        metrics::counter!("lai_rag_points_inserted_total")
            .increment(report.points_inserted as u64);
        metrics::counter!("lai_rag_points_failed_total").increment(report.points_failed as u64);

        if report.is_complete() {
            info!(
                collection = collection,
                points = report.points_inserted,
                "Collection build complete"
            );
        } else {
            warn!(
                collection = collection,
                inserted = report.points_inserted,
                failed = report.points_failed,
                "Collection build finished with failures"
            );
        }

        Ok(report)
    }

    /// Upsert one batch with the documented retry policy: one synchronous
    /// retry, then per-point degradation. Never fatal to the build.
    async fn upsert_batch(
        &self,
        collection: &str,
        batch: &[IndexPoint],
        report: &mut BuildReport,
    ) {
        match self.store.upsert(collection, batch).await {
            Ok(()) => {
                report.points_inserted += batch.len();
                return;
            }
            Err(e) => {
                warn!(
                    collection = collection,
                    batch_len = batch.len(),
                    error = %e,
                    "Batch upsert failed, retrying once"
                );
            }
        }

        report.batches_retried += 1;
        metrics::counter!("lai_rag_batches_retried_total").increment(1);

        match self.store.upsert(collection, batch).await {
            Ok(()) => {
                report.points_inserted += batch.len();
                return;
            }
            Err(e) => {
                warn!(
                    collection = collection,
                    batch_len = batch.len(),
                    error = %e,
                    "Batch retry failed, degrading to per-point upserts"
                );
            }
        }

        for point in batch {
            match self.store.upsert(collection, std::slice::from_ref(point)).await {
                Ok(()) => report.points_inserted += 1,
                Err(e) => {
                    warn!(
                        collection = collection,
                        point_id = point.id,
                        error = %e,
                        "Point upsert failed"
                    );
                    report.points_failed += 1;
                }
            }
        }
    }
}
