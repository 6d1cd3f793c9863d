//! Reciprocal Rank Fusion (RRF) for combining ranked ID lists
//!
//! RRF is a simple but effective fusion method that:
//! - Doesn't require score normalization
//! - Works well with different scoring distributions
//! - Is robust to outliers

use std::collections::HashMap;

/// Default rank-decay constant
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Fuse ranked ID lists (best first) into one score map.
///
/// Each ID scores `sum(1 / (rrf_k + rank))` over the lists containing it,
/// with 1-based ranks. Scores are not normalized.
pub fn rrf_score<S: AsRef<str>>(lists: &[Vec<S>], rrf_k: f64) -> HashMap<String, f64> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for list in lists {
        for (rank, id) in list.iter().enumerate() {
            *scores.entry(id.as_ref().to_string()).or_insert(0.0) += 1.0 / (rrf_k + (rank + 1) as f64);
        }
    }

    scores
}

/// RRF fusion parameters
#[derive(Debug, Clone)]
pub struct RRFusion {
    /// Constant k (typically 60)
    pub k: f64,
}

impl Default for RRFusion {
    fn default() -> Self {
        Self { k: DEFAULT_RRF_K }
    }
}

impl RRFusion {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    /// Fuse ranked ID lists using this fusion's `k`
    pub fn fuse<S: AsRef<str>>(&self, lists: &[Vec<S>]) -> HashMap<String, f64> {
        rrf_score(lists, self.k)
    }

    /// Stable sort of `ids` by fused score descending; missing IDs score 0
    pub fn order<S: AsRef<str>>(&self, ids: &mut [S], scores: &HashMap<String, f64>) {
        let score = |id: &S| scores.get(id.as_ref()).copied().unwrap_or(0.0);
        ids.sort_by(|a, b| score(b).total_cmp(&score(a)));
    }
}
