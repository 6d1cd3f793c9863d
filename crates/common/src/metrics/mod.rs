//! Metrics and observability utilities
//!
//! Provides Prometheus-compatible metrics through the `metrics` facade
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all CiteRank metrics
pub const METRICS_PREFIX: &str = "citerank";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of ranked searches"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Ranked search latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of documents returned from the last search"
    );

    describe_histogram!(
        format!("{}_expansion_rounds", METRICS_PREFIX),
        Unit::Count,
        "Expansion rounds executed per retrieval"
    );

    describe_counter!(
        format!("{}_expansion_exhausted_total", METRICS_PREFIX),
        Unit::Count,
        "Retrievals that hit the expansion ceiling before reaching k_docs"
    );

    describe_counter!(
        format!("{}_collaborator_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed calls to external collaborators"
    );

    describe_histogram!(
        format!("{}_pagerank_iterations", METRICS_PREFIX),
        Unit::Count,
        "Power iterations until PageRank convergence"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, mode: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record the shape of one expansion run
pub fn record_expansion(rounds: usize, target_reached: bool) {
    histogram!(format!("{}_expansion_rounds", METRICS_PREFIX)).record(rounds as f64);

    if !target_reached {
        counter!(format!("{}_expansion_exhausted_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record a collaborator failure
pub fn record_collaborator_error(service: &str, kind: &str) {
    counter!(
        format!("{}_collaborator_errors_total", METRICS_PREFIX),
        "service" => service.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Helper to record PageRank convergence
pub fn record_pagerank(iterations: usize, node_count: usize) {
    histogram!(
        format!("{}_pagerank_iterations", METRICS_PREFIX),
        "size" => size_bucket(node_count)
    )
    .record(iterations as f64);
}

/// Helper to record embedding metrics
pub fn record_embedding(model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

fn size_bucket(node_count: usize) -> &'static str {
    match node_count {
        0..=100 => "small",
        101..=10_000 => "medium",
        _ => "large",
    }
}
