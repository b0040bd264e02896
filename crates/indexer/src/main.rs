//! lai-rag Indexer
//!
//! Out-of-band batch job that builds the pedido and recurso vector
//! collections. Embeddings come from the precomputed cache when present and
//! are generated (then cached) otherwise. Builds are full replacements; a
//! running server only picks them up on its next startup.

mod builder;
mod payload;

use anyhow::Context;
use builder::{BuildReport, IndexBuilder};
use lai_common::{cache, config::AppConfig, embeddings, models, store::QdrantStore, Embedder};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));
    if config.observability.json_logging {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    lai_common::metrics::register_metrics();
    info!(version = lai_common::VERSION, "Starting lai-rag indexer");

    // Load the source tables
    let requests = models::load_requests(&config.data.requests_path)?;
    let appeals = models::load_appeals(&config.data.appeals_path)?;

    let embedder = embeddings::create_embedder(&config.embedding)?;

    // Load or generate embeddings, aligned with table order
    let request_sentences: Vec<String> =
        requests.iter().map(|r| r.sentence.clone()).collect();
    let request_ids: Vec<u64> = requests.iter().map(|r| r.request_id).collect();
    let request_vectors = ensure_embeddings(
        &config.data.requests_cache,
        &config.embedding.model,
        request_ids,
        &request_sentences,
        embedder.clone(),
    )
    .await?;

    let appeal_sentences: Vec<String> = appeals.iter().map(|a| a.sentence.clone()).collect();
    let appeal_ids: Vec<u64> = appeals.iter().map(|a| a.appeal_id).collect();
    let appeal_vectors = ensure_embeddings(
        &config.data.appeals_cache,
        &config.embedding.model,
        appeal_ids,
        &appeal_sentences,
        embedder.clone(),
    )
    .await?;

    let store = Arc::new(QdrantStore::new(&config.store)?);
    let builder = IndexBuilder::new(store);

    // Independent named resources: the two collections build in parallel
    let (request_report, appeal_report) = tokio::try_join!(
        builder.build(
            &config.store.requests_collection,
            &requests,
            &request_vectors,
            payload::request_point,
        ),
        builder.build(
            &config.store.appeals_collection,
            &appeals,
            &appeal_vectors,
            payload::appeal_point,
        ),
    )?;

    summarize(&request_report);
    summarize(&appeal_report);

    if !request_report.is_complete() || !appeal_report.is_complete() {
        warn!("Indexing finished with failed points; see per-collection reports");
    } else {
        info!("Indexing finished successfully");
    }

    Ok(())
}

/// Load embeddings from the cache, generating and caching them when absent.
async fn ensure_embeddings(
    cache_path: &str,
    model: &str,
    ids: Vec<u64>,
    sentences: &[String],
    embedder: Arc<dyn Embedder>,
) -> anyhow::Result<Vec<Vec<f32>>> {
    if Path::new(cache_path).exists() {
        let archive = cache::load(cache_path, model)
            .with_context(|| format!("Failed to load embedding cache {}", cache_path))?;
        if archive.model_mismatch {
            warn!(
                cache = cache_path,
                "Proceeding with embeddings from a different model"
            );
        }
        return Ok(archive.embeddings);
    }

    info!(
        cache = cache_path,
        count = sentences.len(),
        "No embedding cache found, generating embeddings"
    );
    let vectors = embedder.embed_batch(sentences).await?;
    cache::save(cache_path, ids, vectors.clone(), model, None)
        .with_context(|| format!("Failed to write embedding cache {}", cache_path))?;
    Ok(vectors)
}

fn summarize(report: &BuildReport) {
    info!(
        collection = %report.collection,
        inserted = report.points_inserted,
        failed = report.points_failed,
        retried_batches = report.batches_retried,
        complete = report.is_complete(),
        "Build report"
    );
}
