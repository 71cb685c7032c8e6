//! Free-text retrieval over the composition table.

use std::collections::BTreeSet;

use crate::nutrition::reference::ReferenceTables;
use crate::text::{jaccard, tokens};

/// A table row proposed for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Row index in [`ReferenceTables::records`]
    pub index: usize,
    /// Similarity in [0, 1]
    pub score: f32,
}

/// Ranks table rows against a free-text label.
///
/// Implementations must be deterministic and return candidates sorted by
/// descending score.
pub trait Retriever: Send + Sync {
    fn rank(&self, query: &str, limit: usize) -> Vec<Candidate>;
}

/// Token-set Jaccard retrieval. Word order, punctuation, case and plurals are ignored.
#[derive(Debug, Clone)]
pub struct TokenOverlapRetriever {
    entries: Vec<BTreeSet<String>>,
}

impl TokenOverlapRetriever {
    pub fn new(tables: &ReferenceTables) -> Self {
        Self {
            entries: tables.records().iter().map(|r| tokens(&r.label)).collect(),
        }
    }
}

impl Retriever for TokenOverlapRetriever {
    fn rank(&self, query: &str, limit: usize) -> Vec<Candidate> {
        let query = tokens(query);
        let mut ranked: Vec<Candidate> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Candidate {
                index,
                score: jaccard(&query, entry),
            })
            .filter(|c| c.score > 0.0)
            .collect();
        // Ties keep table order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::reference::NutritionRecord;

    fn tables(labels: &[&str]) -> ReferenceTables {
        ReferenceTables::new(
            labels
                .iter()
                .map(|l| NutritionRecord {
                    label: l.to_string(),
                    density: 1.0,
                    nutrients_per_100g: Default::default(),
                    source: None,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_rank_prefers_full_token_match() {
        let t = tables(&["chicken, thigh, fried", "chicken, breast, grilled", "beef steak"]);
        let retriever = TokenOverlapRetriever::new(&t);
        let ranked = retriever.rank("grilled chicken breast", 5);
        assert_eq!(ranked[0].index, 1);
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|c| c.index != 2));
    }

    #[test]
    fn test_rank_is_deterministic_with_ties() {
        let t = tables(&["rice brown", "rice white", "rice wild"]);
        let retriever = TokenOverlapRetriever::new(&t);
        let first = retriever.rank("rice", 2);
        let second = retriever.rank("rice", 2);
        assert_eq!(first, second);
        assert_eq!(first.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_no_overlap_yields_nothing() {
        let t = tables(&["apple"]);
        assert!(TokenOverlapRetriever::new(&t).rank("pizza", 5).is_empty());
    }
}
