//! Citation metadata collaborators
//!
//! The ranking pipeline asks a [`CitationSource`] for the metadata of the
//! documents a query surfaced and builds a request-scoped graph from it.

use super::PaperMetadata;
use async_trait::async_trait;
use citerank_common::errors::{AppError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Provider of `{paper_id: {year, references}}` metadata
#[async_trait]
pub trait CitationSource: Send + Sync {
    /// Metadata for the requested papers; unknown IDs are omitted
    async fn paper_metadata(&self, paper_ids: &[String]) -> Result<BTreeMap<String, PaperMetadata>>;
}

/// In-memory metadata table
#[derive(Debug, Clone, Default)]
pub struct StaticCitationSource {
    papers: BTreeMap<String, PaperMetadata>,
}

impl StaticCitationSource {
    pub fn new(papers: BTreeMap<String, PaperMetadata>) -> Self {
        Self { papers }
    }

    /// Load a JSON object of `{paper_id: {year, references}}`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
            message: format!("Failed to read citation metadata {}: {}", path.display(), e),
        })?;
        let papers: BTreeMap<String, PaperMetadata> = serde_json::from_str(&raw)?;

        tracing::info!(papers = papers.len(), path = %path.display(), "Loaded citation metadata");
        Ok(Self::new(papers))
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

#[async_trait]
impl CitationSource for StaticCitationSource {
    async fn paper_metadata(&self, paper_ids: &[String]) -> Result<BTreeMap<String, PaperMetadata>> {
        Ok(paper_ids
            .iter()
            .filter_map(|id| self.papers.get(id).map(|meta| (id.clone(), meta.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_only_known_papers() {
        let mut papers = BTreeMap::new();
        papers.insert(
            "doc1".to_string(),
            PaperMetadata { year: Some(2021), references: vec!["doc2".into()] },
        );
        let source = StaticCitationSource::new(papers);

        let found = source
            .paper_metadata(&["doc1".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found["doc1"].year, Some(2021));
    }

    #[test]
    fn test_metadata_json_shape() {
        let raw = r#"{"paper_A": {"year": 2023, "references": ["paper_B"]}, "paper_B": {}}"#;
        let papers: BTreeMap<String, PaperMetadata> = serde_json::from_str(raw).unwrap();

        assert_eq!(papers["paper_A"].references, vec!["paper_B"]);
        assert_eq!(papers["paper_B"].year, None);
        assert!(papers["paper_B"].references.is_empty());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = StaticCitationSource::from_json_file("/nonexistent/citations.json").unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
