//! Weighted PageRank citation scoring
//!
//! Edge weights are derived per scoring run:
//! - base weight 1.0
//! - self-citations are multiplied by `self_citation_penalty`
//! - citations to papers with a known year get `1 + recency_boost / (1 + age)`
//!
//! Rank mass of dangling papers (no weighted outgoing edges) is spread
//! uniformly, so scores always sum to 1.

use super::{CitationGraph, ScoredPaper};
use chrono::Datelike;
use citerank_common::config::CitationConfig;
use citerank_common::metrics;
use std::collections::HashMap;

/// PageRank configuration
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (typically 0.85)
    pub alpha: f64,

    /// Boost for citations to recently published papers
    pub recency_boost: f64,

    /// Weight multiplier for self-citations
    pub self_citation_penalty: f64,

    /// Year ages are measured against; `None` means the current UTC year
    pub current_year: Option<i32>,

    /// Maximum iterations
    pub max_iterations: usize,

    /// Per-node convergence threshold on the L1 change
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            alpha: 0.85,
            recency_boost: 1.5,
            self_citation_penalty: 0.2,
            current_year: None,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl From<&CitationConfig> for PageRankConfig {
    fn from(config: &CitationConfig) -> Self {
        Self {
            alpha: config.alpha,
            recency_boost: config.recency_boost,
            self_citation_penalty: config.self_citation_penalty,
            current_year: None,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }
}

impl PageRankConfig {
    /// Pin the reference year used for recency
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    fn reference_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| chrono::Utc::now().year())
    }
}

/// PageRank scorer for papers
#[derive(Debug, Clone, Default)]
pub struct PageRankScorer {
    config: PageRankConfig,
}

impl PageRankScorer {
    /// Create a new scorer
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PageRankConfig {
        &self.config
    }

    /// Weight of the edge `citing -> cited`
    pub fn edge_weight(&self, graph: &CitationGraph, citing: &str, cited: &str, current_year: i32) -> f64 {
        let mut weight = 1.0;

        if citing == cited {
            weight *= self.config.self_citation_penalty;
        }

        if let Some(year) = graph.paper_year(cited) {
            let age = (current_year - year).max(0) as f64;
            weight *= 1.0 + self.config.recency_boost / (1.0 + age);
        }

        weight
    }

    /// Compute PageRank scores for all papers
    pub fn compute(&self, graph: &CitationGraph) -> HashMap<String, f64> {
        let n = graph.node_count();
        if n == 0 {
            return HashMap::new();
        }

        let current_year = self.config.reference_year();
        let alpha = self.config.alpha;
        let n_f64 = n as f64;

        // Derived weighted edge list
        let edges: Vec<(usize, usize, f64)> = graph
            .edge_indices()
            .map(|(from, to)| {
                let w = self.edge_weight(graph, graph.id_at(from), graph.id_at(to), current_year);
                (from, to, w)
            })
            .collect();

        let mut out_weight = vec![0.0f64; n];
        for &(from, _, w) in &edges {
            out_weight[from] += w;
        }

        let mut scores = vec![1.0 / n_f64; n];
        let mut iterations = 0;

        for _ in 0..self.config.max_iterations {
            iterations += 1;

            let dangling: f64 = scores
                .iter()
                .zip(&out_weight)
                .filter(|(_, w)| **w <= 0.0)
                .map(|(s, _)| s)
                .sum();

            let base = (1.0 - alpha) / n_f64 + alpha * dangling / n_f64;
            let mut next = vec![base; n];

            for &(from, to, w) in &edges {
                if out_weight[from] > 0.0 {
                    next[to] += alpha * scores[from] * w / out_weight[from];
                }
            }

            let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
            scores = next;

            // Check convergence
            if delta < n_f64 * self.config.tolerance {
                break;
            }
        }

        // Renormalize so the distribution sums to exactly 1
        let total: f64 = scores.iter().sum();
        if total > 0.0 {
            for score in &mut scores {
                *score /= total;
            }
        }

        metrics::record_pagerank(iterations, n);
        tracing::debug!(nodes = n, edges = edges.len(), iterations, "PageRank converged");

        scores
            .into_iter()
            .enumerate()
            .map(|(idx, score)| (graph.id_at(idx).to_string(), score))
            .collect()
    }

    /// Score and rank papers
    pub fn rank(&self, graph: &CitationGraph, limit: usize) -> Vec<ScoredPaper> {
        let scores = self.compute(graph);

        let mut papers: Vec<ScoredPaper> = graph
            .get_all_papers()
            .into_iter()
            .map(|paper_id| ScoredPaper {
                paper_id: paper_id.to_string(),
                authority_score: scores.get(paper_id).copied().unwrap_or(0.0),
                citation_count: graph.get_citation_count(paper_id),
                reference_count: graph.reference_count(paper_id),
                year: graph.paper_year(paper_id),
            })
            .collect();

        // Sort by authority score descending
        papers.sort_by(|a, b| b.authority_score.total_cmp(&a.authority_score));

        papers.truncate(limit);
        papers
    }
}

impl CitationGraph {
    /// Weighted PageRank over this graph with the given parameters
    pub fn weighted_pagerank(&self, config: &PageRankConfig) -> HashMap<String, f64> {
        PageRankScorer::new(config.clone()).compute(self)
    }
}
