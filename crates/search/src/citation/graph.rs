//! Citation graph representation
//!
//! Provides an in-memory directed citation graph (citing -> cited) for scoring.
//! Nodes are stored densely in insertion order; edge weights are never stored,
//! the scorer derives them on demand.

use super::PaperMetadata;
use std::collections::{BTreeMap, HashMap};

/// In-memory citation graph
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    /// Paper IDs in insertion order
    nodes: Vec<String>,

    /// Paper ID -> dense node index
    index: HashMap<String, usize>,

    /// Adjacency list: node -> nodes it cites
    outgoing: Vec<Vec<usize>>,

    /// Reverse adjacency: node -> nodes citing it
    incoming: Vec<Vec<usize>>,

    /// Publication years, when known
    paper_years: HashMap<String, i32>,

    edge_count: usize,
}

impl CitationGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `{paper_id: {year, references}}` metadata.
    ///
    /// References to papers without their own metadata entry become nodes
    /// with no known year.
    pub fn from_metadata(metadata: &BTreeMap<String, PaperMetadata>) -> Self {
        let mut graph = Self::new();
        graph.build_from_metadata(metadata);
        graph
    }

    /// Ingest `{paper_id: {year, references}}` metadata into this graph
    pub fn build_from_metadata(&mut self, metadata: &BTreeMap<String, PaperMetadata>) {
        for (paper_id, meta) in metadata {
            self.add_paper(paper_id, meta.year);

            for cited in &meta.references {
                self.add_paper(cited, None);
                self.add_citation(paper_id, cited);
            }
        }
    }

    /// Add a paper; a known year overwrites any previously stored one
    pub fn add_paper(&mut self, paper_id: &str, year: Option<i32>) {
        self.node(paper_id);
        if let Some(year) = year {
            self.paper_years.insert(paper_id.to_string(), year);
        }
    }

    /// Add a citation edge (citing -> cited), creating missing endpoints.
    /// Repeated edges collapse into one.
    pub fn add_citation(&mut self, citing: &str, cited: &str) {
        let from = self.node(citing);
        let to = self.node(cited);

        if self.outgoing[from].contains(&to) {
            return;
        }

        self.outgoing[from].push(to);
        self.incoming[to].push(from);
        self.edge_count += 1;
    }

    fn node(&mut self, paper_id: &str) -> usize {
        if let Some(&idx) = self.index.get(paper_id) {
            return idx;
        }

        let idx = self.nodes.len();
        self.nodes.push(paper_id.to_string());
        self.index.insert(paper_id.to_string(), idx);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        idx
    }

    /// Get papers cited by this paper
    pub fn get_citations(&self, paper_id: &str) -> Vec<&str> {
        self.index
            .get(paper_id)
            .map(|&idx| self.outgoing[idx].iter().map(|&n| self.nodes[n].as_str()).collect())
            .unwrap_or_default()
    }

    /// Get papers citing this paper
    pub fn get_cited_by(&self, paper_id: &str) -> Vec<&str> {
        self.index
            .get(paper_id)
            .map(|&idx| self.incoming[idx].iter().map(|&n| self.nodes[n].as_str()).collect())
            .unwrap_or_default()
    }

    /// All paper IDs in insertion order
    pub fn get_all_papers(&self) -> Vec<&str> {
        self.nodes.iter().map(String::as_str).collect()
    }

    /// Whether the paper is a node of this graph
    pub fn contains(&self, paper_id: &str) -> bool {
        self.index.contains_key(paper_id)
    }

    /// Get citation count (incoming edges)
    pub fn get_citation_count(&self, paper_id: &str) -> usize {
        self.index.get(paper_id).map(|&idx| self.incoming[idx].len()).unwrap_or(0)
    }

    /// Get reference count (outgoing edges)
    pub fn reference_count(&self, paper_id: &str) -> usize {
        self.index.get(paper_id).map(|&idx| self.outgoing[idx].len()).unwrap_or(0)
    }

    /// Top `n` papers by in-degree; ties keep insertion order
    pub fn get_most_cited_papers(&self, n: usize) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .nodes
            .iter()
            .zip(&self.incoming)
            .map(|(id, citing)| (id.as_str(), citing.len()))
            .collect();

        // Stable: equal counts stay in insertion order
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(n);
        counts
    }

    /// Publication year, when known
    pub fn paper_year(&self, paper_id: &str) -> Option<i32> {
        self.paper_years.get(paper_id).copied()
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate edges as dense `(citing, cited)` index pairs
    pub(crate) fn edge_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.outgoing
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| targets.iter().map(move |&to| (from, to)))
    }

    pub(crate) fn id_at(&self, idx: usize) -> &str {
        &self.nodes[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::fixtures::small_network;

    #[test]
    fn test_empty_network() {
        let graph = CitationGraph::new();
        assert!(graph.is_empty());
        assert!(graph.get_all_papers().is_empty());
        assert!(graph.get_most_cited_papers(5).is_empty());
    }

    #[test]
    fn test_add_paper() {
        let mut graph = CitationGraph::new();
        graph.add_paper("paper_X", Some(2020));
        assert!(graph.contains("paper_X"));
        assert_eq!(graph.paper_year("paper_X"), Some(2020));

        // Re-adding without a year keeps the known one
        graph.add_paper("paper_X", None);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.paper_year("paper_X"), Some(2020));
    }

    #[test]
    fn test_add_citation() {
        let mut graph = CitationGraph::new();
        graph.add_paper("paper_Y", None);
        graph.add_paper("paper_Z", None);
        graph.add_citation("paper_Y", "paper_Z");

        assert_eq!(graph.get_citations("paper_Y"), vec!["paper_Z"]);
        assert_eq!(graph.get_cited_by("paper_Z"), vec!["paper_Y"]);
    }

    #[test]
    fn test_citation_creates_unknown_endpoints() {
        let mut graph = CitationGraph::new();
        graph.add_citation("citing", "never_declared");

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.paper_year("never_declared"), None);
        assert_eq!(graph.get_citation_count("never_declared"), 1);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = CitationGraph::new();
        graph.add_citation("a", "b");
        graph.add_citation("a", "b");

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.get_citation_count("b"), 1);
    }

    #[test]
    fn test_self_citation_counts_as_incoming() {
        let mut graph = CitationGraph::new();
        graph.add_citation("a", "a");

        assert_eq!(graph.get_citation_count("a"), 1);
        assert_eq!(graph.get_citations("a"), vec!["a"]);
    }

    #[test]
    fn test_graph_queries() {
        let graph = small_network();

        let mut papers = graph.get_all_papers();
        papers.sort();
        assert_eq!(papers, vec!["paper_A", "paper_B", "paper_C"]);

        let mut citations = graph.get_citations("paper_A");
        citations.sort();
        assert_eq!(citations, vec!["paper_B", "paper_C"]);

        let mut cited_by = graph.get_cited_by("paper_C");
        cited_by.sort();
        assert_eq!(cited_by, vec!["paper_A", "paper_B"]);

        assert_eq!(graph.get_citation_count("paper_C"), 2);
        assert_eq!(graph.reference_count("paper_A"), 2);
        assert!(graph.get_citations("missing").is_empty());
    }

    #[test]
    fn test_most_cited_papers() {
        let graph = small_network();
        assert_eq!(graph.get_most_cited_papers(1), vec![("paper_C", 2)]);
    }

    #[test]
    fn test_most_cited_ties_keep_insertion_order() {
        let mut graph = CitationGraph::new();
        graph.add_paper("first", None);
        graph.add_paper("second", None);
        graph.add_citation("x", "second");
        graph.add_citation("y", "first");

        let top = graph.get_most_cited_papers(2);
        assert_eq!(top, vec![("first", 1), ("second", 1)]);
    }
}
