//! Vector similarity search collaborators
//!
//! [`InMemoryIndex`] keeps embedded chunks in memory and ranks them by cosine
//! distance. [`HttpVectorStore`] delegates to a remote vector database.

use super::{Chunk, SimilaritySearch};
use async_trait::async_trait;
use citerank_common::config::VectorStoreConfig;
use citerank_common::embeddings::Embedder;
use citerank_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// One corpus record before embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    #[serde(default)]
    pub doc_id: Option<String>,
    pub content: String,
}

struct IndexedChunk {
    doc_id: Option<String>,
    content: String,
    embedding: Vec<f32>,
}

/// Brute-force cosine index over embedded chunks
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    chunks: Vec<IndexedChunk>,
}

impl InMemoryIndex {
    /// Embed every entry and index it
    pub async fn build(embedder: Arc<dyn Embedder>, entries: Vec<CorpusEntry>) -> Result<Self> {
        let texts: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != entries.len() {
            return Err(AppError::EmbeddingError {
                message: format!(
                    "Embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    entries.len()
                ),
            });
        }

        let chunks = entries
            .into_iter()
            .zip(embeddings)
            .map(|(entry, embedding)| IndexedChunk {
                doc_id: entry.doc_id,
                content: entry.content,
                embedding,
            })
            .collect::<Vec<_>>();

        tracing::info!(chunks = chunks.len(), model = embedder.model_name(), "Built in-memory index");
        Ok(Self { embedder, chunks })
    }

    /// Load a JSON array of [`CorpusEntry`] and index it
    pub async fn from_json_file(embedder: Arc<dyn Embedder>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| AppError::Configuration {
            message: format!("Failed to read corpus {}: {}", path.display(), e),
        })?;
        let entries: Vec<CorpusEntry> = serde_json::from_str(&raw)?;
        Self::build(embedder, entries).await
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// `1 - cos(a, b)`; zero vectors are maximally distant
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl SimilaritySearch for InMemoryIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (i, cosine_distance(&query_embedding, &c.embedding)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, distance)| {
                let chunk = &self.chunks[i];
                Chunk {
                    doc_id: chunk.doc_id.clone(),
                    similarity_distance: distance,
                    content: chunk.content.clone(),
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    collection: &'a str,
    query_embedding: Vec<f32>,
    k: usize,
}

#[derive(Debug, Deserialize)]
struct QueryHit {
    #[serde(default)]
    doc_id: Option<String>,
    distance: f32,
    #[serde(default)]
    content: String,
}

/// Remote vector store reached over HTTP
pub struct HttpVectorStore {
    client: reqwest::Client,
    embedder: Arc<dyn Embedder>,
    base_url: String,
    collection: String,
}

impl HttpVectorStore {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        base_url: impl Into<String>,
        collection: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            embedder,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
        })
    }

    pub fn from_config(embedder: Arc<dyn Embedder>, config: &VectorStoreConfig) -> Result<Self> {
        let url = config.url.clone().ok_or_else(|| AppError::Configuration {
            message: "vector_store.url is required for the http provider".to_string(),
        })?;
        Self::new(embedder, url, config.collection.clone(), Duration::from_secs(config.timeout_secs))
    }

    fn query_url(&self) -> String {
        format!("{}/collections/{}/query", self.base_url, self.collection)
    }
}

#[async_trait]
impl SimilaritySearch for HttpVectorStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let body = QueryRequest { collection: &self.collection, query_embedding, k };

        let response = self
            .client
            .post(self.query_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::CollaboratorUnavailable {
                service: self.name().to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::CollaboratorUnavailable {
                service: self.name().to_string(),
                message: format!("{}: {}", status, text),
            });
        }

        let hits: Vec<QueryHit> = response.json().await?;
        Ok(hits
            .into_iter()
            .take(k)
            .map(|hit| Chunk {
                doc_id: hit.doc_id,
                similarity_distance: hit.distance,
                content: hit.content,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "vector-store"
    }
}
