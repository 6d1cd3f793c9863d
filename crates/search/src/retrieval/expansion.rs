//! Adaptive retrieval expansion
//!
//! Repeatedly queries the similarity-search collaborator, widening the
//! breadth by a fixed step until the accumulated chunks cover `k_docs`
//! distinct documents or a round/breadth ceiling is hit.
//!
//! ```text
//! InitialRetrieval ──enough──▶ AggregateAndReturn
//!        │ expand                    ▲
//!        ▼                           │ enough / ceiling
//!     ExpandK ──▶ ExpandedRetrieval ─┘
//!        ▲             │ expand
//!        └─────────────┘
//! ```

use super::{Chunk, DocumentMap, SimilaritySearch};
use citerank_common::config::RetrievalConfig;
use citerank_common::errors::Result;
use citerank_common::metrics;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Expansion parameters
#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    /// Breadth of the first search
    pub initial_k: usize,

    /// Distinct documents wanted
    pub k_docs: usize,

    /// Breadth added per round
    pub step: usize,

    /// Ceiling on expansion rounds
    pub max_rounds: usize,

    /// Ceiling on search breadth
    pub max_k: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            initial_k: 250,
            k_docs: 50,
            step: 25,
            max_rounds: 8,
            max_k: 1000,
        }
    }
}

impl From<&RetrievalConfig> for ExpansionConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            initial_k: config.initial_k,
            k_docs: config.k_docs,
            step: config.expansion_step,
            max_rounds: config.max_expansion_rounds,
            max_k: config.max_k,
        }
    }
}

/// States of the expansion machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStep {
    InitialRetrieval,
    ExpandK,
    ExpandedRetrieval,
    AggregateAndReturn,
}

/// Outcome of [`should_expand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionDecision {
    Expand,
    Enough,
}

/// Per-request state threaded through the machine
#[derive(Debug, Clone)]
pub struct RetrievalState {
    pub query: String,
    pub k: usize,
    pub expanded_k: usize,
    pub k_docs: usize,
    pub retrieved_chunks: Vec<Chunk>,
    pub documents: DocumentMap,
    pub rounds: usize,
}

impl RetrievalState {
    pub fn new(query: impl Into<String>, k: usize, k_docs: usize) -> Self {
        Self {
            query: query.into(),
            k,
            expanded_k: k,
            k_docs,
            retrieved_chunks: Vec::new(),
            documents: DocumentMap::new(),
            rounds: 0,
        }
    }

    /// Distinct aggregation keys among the accumulated chunks
    pub fn distinct_documents(&self) -> usize {
        self.retrieved_chunks
            .iter()
            .map(Chunk::doc_key)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Expand while fewer than `k_docs` distinct documents have surfaced
pub fn should_expand(state: &RetrievalState) -> ExpansionDecision {
    if state.distinct_documents() < state.k_docs {
        ExpansionDecision::Expand
    } else {
        ExpansionDecision::Enough
    }
}

/// Result of one expansion run
#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    /// Chunks grouped by document, in first-appearance order
    pub documents: DocumentMap,

    /// Expansion rounds executed (0 when the first search sufficed)
    pub rounds: usize,

    /// Breadth of the last search
    pub final_k: usize,

    /// Whether `k_docs` distinct documents were found
    pub target_reached: bool,

    /// Chunks accumulated across all rounds, duplicates included
    pub total_chunks: usize,
}

/// Drives the expansion state machine against a similarity-search collaborator
pub struct ExpansionOrchestrator {
    search: Arc<dyn SimilaritySearch>,
    config: ExpansionConfig,
}

impl ExpansionOrchestrator {
    pub fn new(search: Arc<dyn SimilaritySearch>, config: ExpansionConfig) -> Self {
        Self { search, config }
    }

    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// Run with the configured breadth and target
    pub async fn run(&self, query: &str) -> Result<ExpansionOutcome> {
        self.run_with(query, self.config.initial_k, self.config.k_docs).await
    }

    /// Run with a per-request breadth and target.
    ///
    /// Rounds execute strictly one after another. Collaborator errors abort
    /// the run; hitting the ceiling does not. A breadth above `max_k` is
    /// clamped to it.
    pub async fn run_with(&self, query: &str, k: usize, k_docs: usize) -> Result<ExpansionOutcome> {
        let k = if k > self.config.max_k {
            debug!(requested = k, max_k = self.config.max_k, "Clamping initial breadth");
            self.config.max_k
        } else {
            k
        };
        let mut state = RetrievalState::new(query, k, k_docs);
        let mut step = RetrievalStep::InitialRetrieval;

        loop {
            step = match step {
                RetrievalStep::InitialRetrieval => {
                    state.retrieved_chunks = self.search.search(&state.query, state.k).await?;
                    debug!(
                        k = state.k,
                        chunks = state.retrieved_chunks.len(),
                        distinct = state.distinct_documents(),
                        "Initial retrieval"
                    );
                    Self::transition(&state)
                }
                RetrievalStep::ExpandK => {
                    let next_k = state.expanded_k + self.config.step;
                    if state.rounds >= self.config.max_rounds || next_k > self.config.max_k {
                        warn!(
                            query = %state.query,
                            rounds = state.rounds,
                            breadth = state.expanded_k,
                            distinct = state.distinct_documents(),
                            k_docs = state.k_docs,
                            "Expansion ceiling reached, aggregating partial results"
                        );
                        RetrievalStep::AggregateAndReturn
                    } else {
                        state.expanded_k = next_k;
                        RetrievalStep::ExpandedRetrieval
                    }
                }
                RetrievalStep::ExpandedRetrieval => {
                    let new_chunks = self.search.search(&state.query, state.expanded_k).await?;
                    state.rounds += 1;
                    state.retrieved_chunks.extend(new_chunks);
                    debug!(
                        round = state.rounds,
                        k = state.expanded_k,
                        chunks = state.retrieved_chunks.len(),
                        distinct = state.distinct_documents(),
                        "Expanded retrieval"
                    );
                    Self::transition(&state)
                }
                RetrievalStep::AggregateAndReturn => break,
            };
        }

        state.documents = DocumentMap::from_chunks(&state.retrieved_chunks);
        let target_reached = state.documents.len() >= state.k_docs;

        metrics::record_expansion(state.rounds, target_reached);
        info!(
            search = self.search.name(),
            rounds = state.rounds,
            final_k = state.expanded_k,
            documents = state.documents.len(),
            target_reached,
            "Retrieval complete"
        );

        Ok(ExpansionOutcome {
            total_chunks: state.retrieved_chunks.len(),
            documents: state.documents,
            rounds: state.rounds,
            final_k: state.expanded_k,
            target_reached,
        })
    }

    fn transition(state: &RetrievalState) -> RetrievalStep {
        match should_expand(state) {
            ExpansionDecision::Expand => RetrievalStep::ExpandK,
            ExpansionDecision::Enough => RetrievalStep::AggregateAndReturn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::testing::{FlakySearch, ScriptedSearch};
    use citerank_common::errors::AppError;
    use std::time::Duration;

    fn config(initial_k: usize, k_docs: usize) -> ExpansionConfig {
        ExpansionConfig { initial_k, k_docs, ..ExpansionConfig::default() }
    }

    #[test]
    fn test_should_expand() {
        let mut state = RetrievalState::new("q", 5, 2);
        state.retrieved_chunks = vec![Chunk::new("a", 0.1, ""), Chunk::new("a", 0.2, "")];
        assert_eq!(should_expand(&state), ExpansionDecision::Expand);

        state.retrieved_chunks.push(Chunk::new("b", 0.3, ""));
        assert_eq!(should_expand(&state), ExpansionDecision::Enough);
    }

    #[test]
    fn test_keyless_chunks_count_as_one_document() {
        let mut state = RetrievalState::new("q", 5, 2);
        state.retrieved_chunks = vec![
            Chunk { doc_id: None, similarity_distance: 0.1, content: String::new() },
            Chunk { doc_id: None, similarity_distance: 0.2, content: String::new() },
        ];
        assert_eq!(state.distinct_documents(), 1);
        assert_eq!(should_expand(&state), ExpansionDecision::Expand);
    }

    #[tokio::test]
    async fn test_no_expansion_when_first_round_suffices() {
        let search = Arc::new(ScriptedSearch::corpus(10, 30));
        let orchestrator = ExpansionOrchestrator::new(search.clone(), config(250, 5));

        let outcome = orchestrator.run("graph neural networks").await.unwrap();

        assert_eq!(search.requested(), vec![250]);
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.final_k, 250);
        assert!(outcome.target_reached);
        assert_eq!(outcome.documents.len(), 10);
    }

    #[tokio::test]
    async fn test_expands_until_target_reached() {
        // 40 documents interleaved: a prefix of k chunks covers min(k, 40) docs
        let search = Arc::new(ScriptedSearch::corpus(40, 5));
        let orchestrator = ExpansionOrchestrator::new(search.clone(), config(10, 40));

        let outcome = orchestrator.run("q").await.unwrap();

        assert_eq!(search.requested(), vec![10, 35, 60]);
        assert_eq!(outcome.rounds, 2);
        assert!(outcome.target_reached);
        assert_eq!(outcome.documents.len(), 40);
        // Chunks are appended across rounds without dedup
        assert_eq!(outcome.total_chunks, 10 + 35 + 60);
        assert_eq!(outcome.documents.get("doc0").unwrap().chunk_count(), 1 + 1 + 2);
    }

    #[tokio::test]
    async fn test_small_corpus_terminates_at_round_ceiling() {
        let search = Arc::new(ScriptedSearch::corpus(3, 2));
        let orchestrator = ExpansionOrchestrator::new(
            search.clone(),
            ExpansionConfig { initial_k: 5, k_docs: 50, step: 25, max_rounds: 4, max_k: 10_000 },
        );

        let outcome = orchestrator.run("q").await.unwrap();

        assert_eq!(search.requested(), vec![5, 30, 55, 80, 105]);
        assert_eq!(outcome.rounds, 4);
        assert!(!outcome.target_reached);
        assert_eq!(outcome.documents.len(), 3);
    }

    #[tokio::test]
    async fn test_initial_breadth_is_clamped_to_max_k() {
        let search = Arc::new(ScriptedSearch::corpus(2, 1));
        let orchestrator = ExpansionOrchestrator::new(
            search.clone(),
            ExpansionConfig { initial_k: 250, k_docs: 50, step: 25, max_rounds: 8, max_k: 1000 },
        );

        let outcome = orchestrator.run_with("q", 10_000, 50).await.unwrap();

        // Already at the ceiling, so no expansion round can run either
        assert_eq!(search.requested(), vec![1000]);
        assert_eq!(outcome.final_k, 1000);
        assert_eq!(outcome.rounds, 0);
    }

    #[tokio::test]
    async fn test_breadth_ceiling_stops_expansion() {
        let search = Arc::new(ScriptedSearch::corpus(2, 1));
        let orchestrator = ExpansionOrchestrator::new(
            search.clone(),
            ExpansionConfig { initial_k: 250, k_docs: 50, step: 25, max_rounds: 100, max_k: 300 },
        );

        let outcome = orchestrator.run("q").await.unwrap();

        assert_eq!(search.requested(), vec![250, 275, 300]);
        assert_eq!(outcome.final_k, 300);
        assert!(!outcome.target_reached);
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty_aggregation() {
        let search = Arc::new(ScriptedSearch::new(Vec::new()));
        let orchestrator = ExpansionOrchestrator::new(search, config(5, 3));

        let outcome = orchestrator.run("q").await.unwrap();
        assert!(outcome.documents.is_empty());
        assert!(!outcome.target_reached);
    }

    #[tokio::test]
    async fn test_collaborator_failure_propagates() {
        let search = Arc::new(FlakySearch::new(1));
        let orchestrator = ExpansionOrchestrator::new(search.clone(), config(5, 3));

        let err = orchestrator.run("q").await.unwrap_err();
        assert!(matches!(err, AppError::CollaboratorUnavailable { .. }));
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn test_run_can_be_cancelled() {
        struct Stalled;

        #[async_trait::async_trait]
        impl SimilaritySearch for Stalled {
            async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Chunk>> {
                std::future::pending().await
            }

            fn name(&self) -> &str {
                "stalled"
            }
        }

        let orchestrator = ExpansionOrchestrator::new(Arc::new(Stalled), config(5, 3));
        let result = tokio::time::timeout(Duration::from_millis(20), orchestrator.run("q")).await;
        assert!(result.is_err());
    }
}
