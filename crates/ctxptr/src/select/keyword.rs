//! Rule-based ranker: score candidates by query-term overlap.

use super::ranker::{RankCandidate, RankFuture, Ranker};
use std::collections::HashSet;

/// Ranks summaries by how many distinct query terms they contain.
///
/// Terms are lowercase alphanumeric runs of at least `min_term_len`
/// characters. Candidates with no overlap are left out. Ties keep the
/// candidates' original (creation) order, so the result is deterministic.
#[derive(Debug, Clone)]
pub struct KeywordRanker {
    min_term_len: usize,
}

impl Default for KeywordRanker {
    fn default() -> Self {
        Self { min_term_len: 2 }
    }
}

impl KeywordRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_term_len(mut self, len: usize) -> Self {
        self.min_term_len = len.max(1);
        self
    }

    fn terms(&self, text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= self.min_term_len)
            .map(str::to_lowercase)
            .collect()
    }

    /// The ids this ranker would pick, best first.
    pub fn ranked_ids(&self, query: &str, candidates: &[RankCandidate]) -> Vec<String> {
        let wanted = self.terms(query);
        let mut scored: Vec<(usize, usize, &str)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(pos, c)| {
                let score = self.terms(&c.summary).intersection(&wanted).count();
                (score > 0).then_some((score, pos, c.pointer_id.as_str()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, _, id)| id.to_string()).collect()
    }
}

impl Ranker for KeywordRanker {
    fn rank<'a>(&'a self, query: &'a str, candidates: &'a [RankCandidate]) -> RankFuture<'a> {
        let ids = self.ranked_ids(query, candidates);
        Box::pin(async move {
            serde_json::to_string(&serde_json::json!({ "pointer_ids": ids }))
                .map_err(|e| format!("failed to encode ranking: {e}"))
        })
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
