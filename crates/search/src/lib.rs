//! CiteRank search core
//!
//! - [`retrieval`]: similarity-search collaborators and adaptive expansion
//! - [`citation`]: citation graph and weighted PageRank
//! - [`pipeline`]: ranking of discovered documents in fused or citation mode
//!
//! [`extract_references`] is a standalone helper for building citation
//! metadata offline from document text. The gateway does not call it; its
//! citation source loads metadata that already lists references.

pub mod citation;
pub mod pipeline;
pub mod retrieval;

pub use citation::{
    extract_references, CitationGraph, CitationSource, PageRankConfig, PageRankScorer, PaperMetadata,
    ScoredPaper,
};
pub use pipeline::{RankedDocument, RankingMode, RankingPipeline, RankingRequest};
pub use retrieval::{Chunk, Document, DocumentMap, ExpansionOrchestrator, SimilaritySearch};
