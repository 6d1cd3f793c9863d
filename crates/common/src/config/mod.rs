//! Configuration management for CiteRank services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Retrieval expansion and fusion
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Citation graph scoring
    #[serde(default)]
    pub citation: CitationConfig,

    /// Similarity search collaborator
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Chunk breadth of the first similarity search
    #[serde(default = "default_initial_k")]
    pub initial_k: usize,

    /// Target number of distinct documents
    #[serde(default = "default_k_docs")]
    pub k_docs: usize,

    /// Breadth added per expansion round
    #[serde(default = "default_expansion_step")]
    pub expansion_step: usize,

    /// Hard ceiling on expansion rounds
    #[serde(default = "default_max_expansion_rounds")]
    pub max_expansion_rounds: usize,

    /// Hard ceiling on search breadth
    #[serde(default = "default_max_k")]
    pub max_k: usize,

    /// RRF rank-decay constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CitationConfig {
    /// PageRank damping factor
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Edge boost for recently published cited papers
    #[serde(default = "default_recency_boost")]
    pub recency_boost: f64,

    /// Multiplier applied to self-citation edges
    #[serde(default = "default_self_citation_penalty")]
    pub self_citation_penalty: f64,

    /// Maximum power iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Per-node L1 convergence tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// JSON file of `{paper_id: {year, references}}` used by citation ranking
    pub metadata_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// Provider: memory, http
    #[serde(default = "default_vector_provider")]
    pub provider: String,

    /// Base URL of the HTTP vector store
    pub url: Option<String>,

    /// Collection to query
    #[serde(default = "default_collection")]
    pub collection: String,

    /// JSON corpus for the in-memory index
    pub corpus_path: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_vector_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first failed call
    #[serde(default = "default_vector_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
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

    /// Retries per embedding request. Similarity search already retries
    /// around the embed call, so this stays 0 unless the embedder is used
    /// on its own.
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "citerank_search=debug")
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
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 100 }
fn default_initial_k() -> usize { 250 }
fn default_k_docs() -> usize { 50 }
fn default_expansion_step() -> usize { 25 }
fn default_max_expansion_rounds() -> usize { 8 }
fn default_max_k() -> usize { 1000 }
fn default_rrf_k() -> f64 { 60.0 }
fn default_alpha() -> f64 { 0.85 }
fn default_recency_boost() -> f64 { 1.5 }
fn default_self_citation_penalty() -> f64 { 0.2 }
fn default_max_iterations() -> usize { 100 }
fn default_tolerance() -> f64 { 1e-6 }
fn default_vector_provider() -> String { "memory".to_string() }
fn default_collection() -> String { "documents".to_string() }
fn default_vector_timeout() -> u64 { 10 }
fn default_vector_retries() -> u32 { 1 }
fn default_embedding_provider() -> String { "mock".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 0 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "citerank".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            initial_k: default_initial_k(),
            k_docs: default_k_docs(),
            expansion_step: default_expansion_step(),
            max_expansion_rounds: default_max_expansion_rounds(),
            max_k: default_max_k(),
            rrf_k: default_rrf_k(),
        }
    }
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            recency_boost: default_recency_boost(),
            self_citation_penalty: default_self_citation_penalty(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            metadata_path: None,
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_vector_provider(),
            url: None,
            collection: default_collection(),
            corpus_path: None,
            timeout_secs: default_vector_timeout(),
            max_retries: default_vector_retries(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__RETRIEVAL__K_DOCS=20
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject values the ranking core cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, message: &str| AppError::Configuration {
            message: format!("{}: {}", field, message),
        };

        if self.retrieval.k_docs == 0 {
            return Err(invalid("retrieval.k_docs", "must be at least 1"));
        }
        if self.retrieval.initial_k == 0 {
            return Err(invalid("retrieval.initial_k", "must be at least 1"));
        }
        if self.retrieval.expansion_step == 0 {
            return Err(invalid("retrieval.expansion_step", "must be at least 1"));
        }
        if self.retrieval.rrf_k < 0.0 {
            return Err(invalid("retrieval.rrf_k", "must not be negative"));
        }
        if !(self.citation.alpha > 0.0 && self.citation.alpha < 1.0) {
            return Err(invalid("citation.alpha", "must be in (0, 1)"));
        }
        if self.citation.recency_boost < 0.0 {
            return Err(invalid("citation.recency_boost", "must not be negative"));
        }
        if self.citation.self_citation_penalty < 0.0 {
            return Err(invalid("citation.self_citation_penalty", "must not be negative"));
        }
        if self.vector_store.provider == "http" && self.vector_store.url.is_none() {
            return Err(invalid("vector_store.url", "required for the http provider"));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get the per-call similarity search timeout as Duration
    pub fn vector_store_timeout(&self) -> Duration {
        Duration::from_secs(self.vector_store.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.retrieval.initial_k, 250);
        assert_eq!(config.retrieval.k_docs, 50);
        assert_eq!(config.retrieval.expansion_step, 25);
        assert_eq!(config.citation.alpha, 0.85);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"retrieval": {"k_docs": 3}}"#).unwrap();
        assert_eq!(config.retrieval.k_docs, 3);
        assert_eq!(config.retrieval.initial_k, 250);
        assert_eq!(config.vector_store.provider, "memory");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.retrieval.k_docs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.citation.alpha = 1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.vector_store.provider = "http".into();
        assert!(config.validate().is_err());
    }
}
