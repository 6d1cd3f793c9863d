//! Search handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use citerank_common::errors::{AppError, Result};
use citerank_search::{RankedDocument, RankingMode, RankingRequest};

/// Search query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[serde(default)]
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// Ranking mode: fused (default) or citation
    #[serde(default)]
    pub mode: Option<String>,

    /// Distinct documents wanted
    #[validate(range(min = 1, max = 1000))]
    pub k_docs: Option<usize>,

    /// Initial search breadth
    #[validate(range(min = 1, max = 10000))]
    pub k: Option<usize>,
}

/// Rank documents for a query.
///
/// The whole ranking run shares the server request budget; overrunning it
/// yields a `COLLABORATOR_TIMEOUT` error body.
#[instrument(skip(state, params), fields(query = %params.query, mode = ?params.mode))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<RankedDocument>>> {
    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation {
            message: "query must not be blank".to_string(),
            field: Some("query".to_string()),
        });
    }

    let mode = match params.mode.as_deref() {
        Some(mode) => mode.parse::<RankingMode>()?,
        None => RankingMode::default(),
    };

    let request = RankingRequest {
        k_docs: params.k_docs,
        k: params.k,
    };

    let budget = state.config.request_timeout();
    let results = tokio::time::timeout(budget, state.pipeline.rank_with(query, mode, request))
        .await
        .map_err(|_| AppError::CollaboratorTimeout {
            service: "search".to_string(),
            timeout_ms: budget.as_millis() as u64,
        })??;
    Ok(Json(results))
}
