//! Ranking pipeline
//!
//! Runs adaptive retrieval, then orders the discovered documents either by
//! fusing two evidence orderings with RRF or by citation authority.

use crate::citation::{CitationGraph, CitationSource, PageRankConfig, PageRankScorer};
use crate::retrieval::{Chunk, Document, ExpansionConfig, ExpansionOrchestrator, RRFusion, SimilaritySearch};
use citerank_common::config::{AppConfig, RetrievalConfig};
use citerank_common::errors::{AppError, Result};
use citerank_common::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// How discovered documents are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingMode {
    /// RRF over evidence volume and best similarity
    #[default]
    Fused,
    /// Weighted PageRank over the discovered documents' citations
    Citation,
}

impl RankingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMode::Fused => "fused",
            RankingMode::Citation => "citation",
        }
    }
}

impl FromStr for RankingMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fused" | "rrf" => Ok(RankingMode::Fused),
            "citation" | "pagerank" => Ok(RankingMode::Citation),
            other => Err(AppError::Validation {
                message: format!("Unknown ranking mode '{}', expected fused or citation", other),
                field: Some("mode".to_string()),
            }),
        }
    }
}

/// A ranked document with the score of the active mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDocument {
    pub document_id: String,
    pub chunks: Vec<Chunk>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrf_score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_score: Option<f64>,
}

/// Per-request overrides
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingRequest {
    /// Distinct documents wanted; defaults to the configured `k_docs`
    pub k_docs: Option<usize>,
    /// Initial search breadth; defaults to the configured `initial_k`
    pub k: Option<usize>,
}

/// Retrieval plus ranking, shared across requests
pub struct RankingPipeline {
    orchestrator: ExpansionOrchestrator,
    fusion: RRFusion,
    scorer: PageRankScorer,
    citations: Option<Arc<dyn CitationSource>>,
}

impl RankingPipeline {
    pub fn new(
        search: Arc<dyn SimilaritySearch>,
        retrieval: &RetrievalConfig,
        pagerank: PageRankConfig,
    ) -> Self {
        Self {
            orchestrator: ExpansionOrchestrator::new(search, ExpansionConfig::from(retrieval)),
            fusion: RRFusion::new(retrieval.rrf_k),
            scorer: PageRankScorer::new(pagerank),
            citations: None,
        }
    }

    pub fn from_config(search: Arc<dyn SimilaritySearch>, config: &AppConfig) -> Self {
        Self::new(search, &config.retrieval, PageRankConfig::from(&config.citation))
    }

    /// Attach the metadata source used by citation mode
    pub fn with_citation_source(mut self, source: Arc<dyn CitationSource>) -> Self {
        self.citations = Some(source);
        self
    }

    pub fn has_citation_source(&self) -> bool {
        self.citations.is_some()
    }

    /// Rank with configured defaults
    pub async fn rank(&self, query: &str, mode: RankingMode) -> Result<Vec<RankedDocument>> {
        self.rank_with(query, mode, RankingRequest::default()).await
    }

    pub async fn rank_with(
        &self,
        query: &str,
        mode: RankingMode,
        request: RankingRequest,
    ) -> Result<Vec<RankedDocument>> {
        let start = Instant::now();
        let config = self.orchestrator.config();
        let k_docs = request.k_docs.unwrap_or(config.k_docs);
        let k = request.k.unwrap_or(config.initial_k);

        let outcome = self.orchestrator.run_with(query, k, k_docs).await?;
        let documents = outcome.documents.into_documents();

        let ranked = match mode {
            RankingMode::Fused => self.rank_fused(documents, k_docs),
            RankingMode::Citation => self.rank_by_citation(documents, k_docs).await?,
        };

        metrics::record_search(start.elapsed().as_secs_f64(), mode.as_str(), ranked.len());
        info!(
            mode = mode.as_str(),
            results = ranked.len(),
            rounds = outcome.rounds,
            "Ranked documents"
        );

        Ok(ranked)
    }

    /// Fuse the volume and similarity orderings with RRF
    pub fn rank_fused(&self, documents: Vec<Document>, k_docs: usize) -> Vec<RankedDocument> {
        let by_volume = order_by_volume(&documents);
        let by_similarity = order_by_similarity(&documents);

        let scores = self.fusion.fuse(&[by_volume.clone(), by_similarity]);
        let mut ordered = by_volume;
        self.fusion.order(&mut ordered, &scores);

        let mut by_id: HashMap<String, Document> =
            documents.into_iter().map(|d| (d.doc_id.clone(), d)).collect();

        ordered
            .into_iter()
            .take(k_docs)
            .filter_map(|id| {
                let document = by_id.remove(&id)?;
                Some(RankedDocument {
                    rrf_score: Some(scores.get(&id).copied().unwrap_or(0.0)),
                    document_id: id,
                    chunks: document.chunks,
                    citation_score: None,
                })
            })
            .collect()
    }

    /// Order by weighted PageRank over a request-scoped citation graph
    pub async fn rank_by_citation(&self, documents: Vec<Document>, k_docs: usize) -> Result<Vec<RankedDocument>> {
        let ids: Vec<String> = documents.iter().map(|d| d.doc_id.clone()).collect();

        let mut graph = CitationGraph::new();
        for id in &ids {
            graph.add_paper(id, None);
        }

        match &self.citations {
            Some(source) => {
                let metadata = source.paper_metadata(&ids).await?;
                graph.build_from_metadata(&metadata);
            }
            None => warn!("No citation source configured, citation scores are uniform"),
        }

        let scores = self.scorer.compute(&graph);
        let score = |id: &str| scores.get(id).copied().unwrap_or(0.0);

        let mut ranked: Vec<RankedDocument> = documents
            .into_iter()
            .map(|d| RankedDocument {
                citation_score: Some(score(&d.doc_id)),
                document_id: d.doc_id,
                chunks: d.chunks,
                rrf_score: None,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.citation_score
                .unwrap_or(0.0)
                .total_cmp(&a.citation_score.unwrap_or(0.0))
        });
        ranked.truncate(k_docs);

        Ok(ranked)
    }
}

/// Document IDs by chunk count descending; ties keep input order
pub fn order_by_volume(documents: &[Document]) -> Vec<String> {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by(|a, b| b.chunk_count().cmp(&a.chunk_count()));
    sorted.into_iter().map(|d| d.doc_id.clone()).collect()
}

/// Document IDs by closest chunk ascending; ties keep input order
pub fn order_by_similarity(documents: &[Document]) -> Vec<String> {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by(|a, b| a.best_distance().total_cmp(&b.best_distance()));
    sorted.into_iter().map(|d| d.doc_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::{PaperMetadata, StaticCitationSource};
    use crate::retrieval::testing::ScriptedSearch;
    use crate::retrieval::DocumentMap;
    use std::collections::BTreeMap;

    fn retrieval(initial_k: usize, k_docs: usize) -> RetrievalConfig {
        RetrievalConfig { initial_k, k_docs, ..RetrievalConfig::default() }
    }

    /// a: 3 chunks, far; b: 1 chunk, closest; c: 2 chunks, middling
    fn ranking() -> Vec<Chunk> {
        vec![
            Chunk::new("a", 0.40, "a1"),
            Chunk::new("b", 0.05, "b1"),
            Chunk::new("a", 0.45, "a2"),
            Chunk::new("c", 0.20, "c1"),
            Chunk::new("a", 0.50, "a3"),
            Chunk::new("c", 0.25, "c2"),
        ]
    }

    fn pipeline(k_docs: usize) -> RankingPipeline {
        RankingPipeline::new(
            Arc::new(ScriptedSearch::new(ranking())),
            &retrieval(10, k_docs),
            PageRankConfig::default().with_current_year(2026),
        )
    }

    fn ids(ranked: &[RankedDocument]) -> Vec<&str> {
        ranked.iter().map(|d| d.document_id.as_str()).collect()
    }

    #[test]
    fn test_evidence_orderings() {
        let documents = DocumentMap::from_chunks(&ranking()).into_documents();
        assert_eq!(order_by_volume(&documents), vec!["a", "c", "b"]);
        assert_eq!(order_by_similarity(&documents), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_fused_ordering() {
        let ranked = pipeline(3).rank("q", RankingMode::Fused).await.unwrap();

        // 1/61 + 1/63 beats 2/62: a and b tie ahead of c and keep volume order
        assert_eq!(ids(&ranked), vec!["a", "b", "c"]);
        assert!(ranked.iter().all(|d| d.rrf_score.is_some() && d.citation_score.is_none()));
        assert_eq!(ranked[0].chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_fused_truncates_to_k_docs() {
        let pipeline = pipeline(2);
        let ranked = pipeline
            .rank_with("q", RankingMode::Fused, RankingRequest { k_docs: Some(1), k: None })
            .await
            .unwrap();
        assert_eq!(ids(&ranked), vec!["a"]);
    }

    #[tokio::test]
    async fn test_identical_runs_give_identical_order() {
        let pipeline = pipeline(3);
        let first = pipeline.rank("q", RankingMode::Fused).await.unwrap();
        let second = pipeline.rank("q", RankingMode::Fused).await.unwrap();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_citation_mode_orders_by_authority() {
        let mut papers = BTreeMap::new();
        papers.insert("a".to_string(), PaperMetadata { year: Some(2023), references: vec!["b".into(), "c".into()] });
        papers.insert("c".to_string(), PaperMetadata { year: Some(2019), references: vec!["b".into()] });
        papers.insert("b".to_string(), PaperMetadata { year: Some(2015), references: vec![] });

        let pipeline = pipeline(3).with_citation_source(Arc::new(StaticCitationSource::new(papers)));
        let ranked = pipeline.rank("q", RankingMode::Citation).await.unwrap();

        assert_eq!(ids(&ranked), vec!["b", "c", "a"]);
        assert!(ranked.iter().all(|d| d.citation_score.is_some() && d.rrf_score.is_none()));
        let total: f64 = ranked.iter().filter_map(|d| d.citation_score).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_citation_mode_without_source_keeps_discovery_order() {
        let ranked = pipeline(3).rank("q", RankingMode::Citation).await.unwrap();
        assert_eq!(ids(&ranked), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("fused".parse::<RankingMode>().unwrap(), RankingMode::Fused);
        assert_eq!("Citation".parse::<RankingMode>().unwrap(), RankingMode::Citation);
        assert!("merged".parse::<RankingMode>().is_err());
        assert_eq!(RankingMode::default(), RankingMode::Fused);
    }

    #[test]
    fn test_only_active_score_serialized() {
        let doc = RankedDocument {
            document_id: "a".into(),
            chunks: vec![],
            rrf_score: Some(0.5),
            citation_score: None,
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["rrf_score"], 0.5);
        assert!(json.get("citation_score").is_none());
    }
}
