//! Citation scoring handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use citerank_common::errors::{AppError, Result};
use citerank_search::{CitationGraph, PageRankConfig, PageRankScorer, PaperMetadata, ScoredPaper};

/// Rank papers by weighted PageRank
#[derive(Debug, Deserialize, Validate)]
pub struct RankCitationsRequest {
    /// `{paper_id: {year, references}}`
    pub papers: BTreeMap<String, PaperMetadata>,

    /// Limit for both `scores` and `most_cited`
    #[validate(range(min = 1))]
    pub top_n: Option<usize>,

    /// Reference year for recency; defaults to the current UTC year
    pub current_year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CitedPaper {
    pub paper_id: String,
    pub citation_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RankCitationsResponse {
    pub scores: Vec<ScoredPaper>,
    pub most_cited: Vec<CitedPaper>,
}

const DEFAULT_MOST_CITED: usize = 10;

#[instrument(skip(state, request), fields(papers = request.papers.len()))]
pub async fn rank_citations(
    State(state): State<AppState>,
    Json(request): Json<RankCitationsRequest>,
) -> Result<Json<RankCitationsResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("top_n".to_string()),
    })?;

    let graph = CitationGraph::from_metadata(&request.papers);

    let mut config = PageRankConfig::from(&state.config.citation);
    if let Some(year) = request.current_year {
        config = config.with_current_year(year);
    }
    let scorer = PageRankScorer::new(config);

    let scores = scorer.rank(&graph, request.top_n.unwrap_or(graph.node_count()));
    let most_cited = graph
        .get_most_cited_papers(request.top_n.unwrap_or(DEFAULT_MOST_CITED))
        .into_iter()
        .map(|(paper_id, citation_count)| CitedPaper {
            paper_id: paper_id.to_string(),
            citation_count,
        })
        .collect();

    Ok(Json(RankCitationsResponse { scores, most_cited }))
}
