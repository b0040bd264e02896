//! Metrics registration
//!
//! Standardized metric names shared by the indexer and the retrieval path.

use metrics::{describe_counter, describe_histogram, Unit};

/// Metrics prefix for all lai-rag metrics
pub const METRICS_PREFIX: &str = "lai_rag";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_points_inserted_total", METRICS_PREFIX),
        Unit::Count,
        "Points successfully upserted during collection builds"
    );

    describe_counter!(
        format!("{}_points_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Points that failed both batch and per-item upsert"
    );

    describe_counter!(
        format!("{}_batches_retried_total", METRICS_PREFIX),
        Unit::Count,
        "Upsert batches retried after a transient failure"
    );

    describe_counter!(
        format!("{}_queries_routed_total", METRICS_PREFIX),
        Unit::Count,
        "Queries classified, labelled by route"
    );

    describe_histogram!(
        format!("{}_context_resolve_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end context assembly latency"
    );
}
