//! Citation authority scoring
//!
//! Implements a weighted PageRank over the citation graph, with a recency
//! boost for newer cited papers and a penalty for self-citations.
//!
//! [`extract_references`] is not on the request path. It prepares
//! `references` lists for metadata files from plain document text.

mod graph;
mod pagerank;
mod references;
mod source;

pub use graph::CitationGraph;
pub use pagerank::{PageRankConfig, PageRankScorer};
pub use references::extract_references;
pub use source::{CitationSource, StaticCitationSource};

use serde::{Deserialize, Serialize};

/// Per-paper input to graph construction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// Publication year, when known
    #[serde(default)]
    pub year: Option<i32>,

    /// IDs of the papers this one cites
    #[serde(default)]
    pub references: Vec<String>,
}

/// Paper with citation score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPaper {
    /// Paper ID
    pub paper_id: String,

    /// Weighted PageRank score; sums to 1 across the graph
    pub authority_score: f64,

    /// Number of incoming citations
    pub citation_count: usize,

    /// Number of outgoing references
    pub reference_count: usize,

    /// Publication year, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{CitationGraph, PaperMetadata};
    use std::collections::BTreeMap;

    /// A -> {B, C}, B -> {C}; years A=2023, B=2019, C=2015
    pub(crate) fn small_network() -> CitationGraph {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "paper_A".to_string(),
            PaperMetadata { year: Some(2023), references: vec!["paper_B".into(), "paper_C".into()] },
        );
        metadata.insert(
            "paper_B".to_string(),
            PaperMetadata { year: Some(2019), references: vec!["paper_C".into()] },
        );
        metadata.insert(
            "paper_C".to_string(),
            PaperMetadata { year: Some(2015), references: vec![] },
        );
        CitationGraph::from_metadata(&metadata)
    }
}
