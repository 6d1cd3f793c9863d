//! CiteRank API Gateway
//!
//! HTTP entry point for ranked search and citation scoring.
//! Handles:
//! - Composition of the embedder, similarity search and citation source
//! - Request routing
//! - Observability (logging, request IDs, Prometheus metrics)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use citerank_common::{
    config::AppConfig,
    embeddings::create_embedder,
    metrics::{self, LATENCY_BUCKETS},
};
use citerank_search::{
    citation::StaticCitationSource,
    retrieval::{HttpVectorStore, InMemoryIndex, RetryingSearch},
    RankingPipeline, SimilaritySearch,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<RankingPipeline>,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config);

    info!("Starting CiteRank API Gateway v{}", citerank_common::VERSION);

    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    let metrics_handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)?
        .install_recorder()?;
    metrics::register_metrics();

    let pipeline = build_pipeline(&config).await?;

    let state = AppState {
        config: config.clone(),
        pipeline: Arc::new(pipeline),
        metrics: metrics_handle,
    };

    // Build the router
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Wire the similarity-search collaborator and citation source into a pipeline
async fn build_pipeline(config: &AppConfig) -> anyhow::Result<RankingPipeline> {
    let embedder = create_embedder(&config.embedding)?;
    let store = &config.vector_store;

    let search: Arc<dyn SimilaritySearch> = match store.provider.as_str() {
        "http" => {
            let remote = HttpVectorStore::from_config(embedder, store)?;
            Arc::new(RetryingSearch::from_config(remote, store))
        }
        provider => {
            if provider != "memory" {
                warn!(provider, "Unknown vector store provider, using in-memory index");
            }
            let index = match &store.corpus_path {
                Some(path) => InMemoryIndex::from_json_file(embedder, path).await?,
                None => {
                    warn!("No corpus_path configured, in-memory index is empty");
                    InMemoryIndex::build(embedder, Vec::new()).await?
                }
            };
            Arc::new(RetryingSearch::from_config(index, store))
        }
    };
    info!(search = search.name(), "Similarity search ready");

    let mut pipeline = RankingPipeline::from_config(search, config);
    if let Some(path) = &config.citation.metadata_path {
        let source = StaticCitationSource::from_json_file(path)?;
        pipeline = pipeline.with_citation_source(Arc::new(source));
    }

    Ok(pipeline)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let concurrency = GlobalConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests);

    Router::new()
        // Health
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // Ranking
        .route("/search", get(handlers::search::search))
        .route("/citations/rank", post(handlers::citations::rank_citations))

        .layer(concurrency)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
