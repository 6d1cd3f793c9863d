//! Chunk retrieval and document aggregation
//!
//! Provides:
//! - The similarity-search collaborator seam ([`SimilaritySearch`])
//! - In-memory and HTTP vector store implementations, plus a retry wrapper
//! - The adaptive expansion loop that widens search breadth until enough
//!   distinct documents surface
//! - Reciprocal Rank Fusion over document orderings

mod expansion;
mod fusion;
mod retry;
mod vector;

pub use expansion::{
    should_expand, ExpansionConfig, ExpansionDecision, ExpansionOrchestrator, ExpansionOutcome,
    RetrievalState, RetrievalStep,
};
pub use fusion::{rrf_score, RRFusion, DEFAULT_RRF_K};
pub use retry::RetryingSearch;
pub use vector::{CorpusEntry, HttpVectorStore, InMemoryIndex};

use citerank_common::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregation key for chunks that carry no `doc_id`
pub const UNKNOWN_DOC_ID: &str = "unknown";

/// Retrieved chunk with its distance to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Parent document, when the index recorded one
    pub doc_id: Option<String>,

    /// Distance to the query; lower is more similar
    pub similarity_distance: f32,

    /// Chunk text
    pub content: String,
}

impl Chunk {
    pub fn new(doc_id: impl Into<String>, similarity_distance: f32, content: impl Into<String>) -> Self {
        Self {
            doc_id: Some(doc_id.into()),
            similarity_distance,
            content: content.into(),
        }
    }

    /// Key this chunk aggregates under
    pub fn doc_key(&self) -> &str {
        self.doc_id.as_deref().unwrap_or(UNKNOWN_DOC_ID)
    }
}

/// A document and the chunks one query surfaced for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub chunks: Vec<Chunk>,
}

impl Document {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Distance of the closest chunk
    pub fn best_distance(&self) -> f32 {
        self.chunks
            .iter()
            .map(|c| c.similarity_distance)
            .fold(f32::INFINITY, f32::min)
    }
}

/// Chunks grouped by document, in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct DocumentMap {
    documents: Vec<Document>,
    index: HashMap<String, usize>,
}

impl DocumentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group chunks by `doc_id`, keyless chunks under [`UNKNOWN_DOC_ID`]
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut map = Self::new();
        for chunk in chunks {
            map.push(chunk.clone());
        }
        map
    }

    pub fn push(&mut self, chunk: Chunk) {
        let key = chunk.doc_key();
        match self.index.get(key) {
            Some(&idx) => self.documents[idx].chunks.push(chunk),
            None => {
                let doc_id = key.to_string();
                self.index.insert(doc_id.clone(), self.documents.len());
                self.documents.push(Document { doc_id, chunks: vec![chunk] });
            }
        }
    }

    pub fn get(&self, doc_id: &str) -> Option<&Document> {
        self.index.get(doc_id).map(|&idx| &self.documents[idx])
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn doc_ids(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.doc_id.clone()).collect()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

/// External nearest-neighbour search over document chunks
#[async_trait::async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Up to `k` chunks for the query, best match first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>>;

    /// Collaborator name used in logs, metrics and errors
    fn name(&self) -> &str;
}
