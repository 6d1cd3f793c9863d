//! CiteRank Common Library
//!
//! Shared code for the CiteRank crates including:
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability
//! - Embedding client abstraction

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use embeddings::Embedder;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
