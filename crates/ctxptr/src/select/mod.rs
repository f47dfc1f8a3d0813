//! Relevance selection over stored pointers.
//!
//! [`RelevanceSelector`] asks a [`Ranker`] which candidates matter for a
//! query, then enforces the contract itself:
//!
//! 1. ids not among the candidates are dropped (duplicates keep their first
//!    position),
//! 2. the remainder is cut to `max_selected` in the ranker's order,
//! 3. ranker errors, timeouts, and malformed answers are selection failures.
//!
//! A failure yields an empty selection unless `fail_closed` is turned off,
//! in which case the [`SelectionError`] is returned. It never falls back to
//! selecting everything.
//!
//! Rankers shipped here:
//! - [`keyword::KeywordRanker`] — term overlap, deterministic, offline.
//! - [`llm::LlmRanker`] — asks a model through [`OpenRouterClient`](crate::client::OpenRouterClient).

pub mod keyword;
pub mod llm;
pub mod ranker;

pub use keyword::KeywordRanker;
pub use llm::LlmRanker;
pub use ranker::{RankCandidate, RankFuture, Ranker, SelectionResponse, parse_response};

use crate::config::SelectorConfig;
use crate::error::SelectionError;
use crate::pointer::ContextPointer;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Picks a bounded, ordered subset of candidate pointers for a query.
pub struct RelevanceSelector<'r> {
    ranker: &'r dyn Ranker,
    config: SelectorConfig,
}

impl<'r> RelevanceSelector<'r> {
    pub fn new(ranker: &'r dyn Ranker, config: SelectorConfig) -> Self {
        Self { ranker, config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Select up to `max_selected` candidates, most relevant first.
    ///
    /// With fail-closed on (the default) this never returns `Err`.
    pub async fn select(
        &self,
        query: &str,
        candidates: &[ContextPointer],
    ) -> Result<Vec<ContextPointer>, SelectionError> {
        if candidates.is_empty() || self.config.max_selected == 0 {
            return Ok(Vec::new());
        }

        match self.try_select(query, candidates).await {
            Ok(selected) => {
                debug!(
                    "Selected {} of {} pointer(s) via {}",
                    selected.len(),
                    candidates.len(),
                    self.ranker.name()
                );
                Ok(selected)
            }
            Err(e) if self.config.fail_closed => {
                warn!("Selection failed, returning no context: {e}");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn try_select(
        &self,
        query: &str,
        candidates: &[ContextPointer],
    ) -> Result<Vec<ContextPointer>, SelectionError> {
        let ranked: Vec<RankCandidate> = candidates.iter().map(RankCandidate::from).collect();

        let raw = tokio::time::timeout(self.config.timeout, self.ranker.rank(query, &ranked))
            .await
            .map_err(|_| SelectionError::Timeout(self.config.timeout))?
            .map_err(SelectionError::Ranker)?;

        let response = parse_response(&raw)?;
        Ok(validate(response.pointer_ids, candidates, self.config.max_selected))
    }
}

/// Keep known ids in the ranker's order, without repeats, up to `max`.
fn validate(
    ids: Vec<String>,
    candidates: &[ContextPointer],
    max: usize,
) -> Vec<ContextPointer> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for id in ids {
        if selected.len() >= max {
            break;
        }
        if !seen.insert(id.clone()) {
            continue;
        }
        match candidates.iter().find(|c| c.pointer_id == id) {
            Some(pointer) => selected.push(pointer.clone()),
            None => debug!("Dropping unknown pointer id from ranker: {id}"),
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a canned answer and records what it was shown.
    struct StubRanker {
        answer: Result<String, String>,
        delay: Option<Duration>,
        seen: Mutex<Vec<RankCandidate>>,
    }

    impl StubRanker {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: &str) -> Self {
            Self {
                answer: Err(err.to_string()),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Ranker for StubRanker {
        fn rank<'a>(&'a self, _query: &'a str, candidates: &'a [RankCandidate]) -> RankFuture<'a> {
            self.seen.lock().unwrap().extend_from_slice(candidates);
            Box::pin(async move {
                if let Some(d) = self.delay {
                    tokio::time::sleep(d).await;
                }
                self.answer.clone()
            })
        }
    }

    fn pointer(id: &str) -> ContextPointer {
        ContextPointer {
            pointer_id: id.into(),
            query_id: "q1".into(),
            task_id: None,
            tool_name: "search".into(),
            args: serde_json::Map::new(),
            created_at: Utc::now(),
            summary: format!("search(id=\"{id}\")"),
            result_path: String::new(),
            source_urls: vec![],
        }
    }

    fn ids(pointers: &[ContextPointer]) -> Vec<&str> {
        pointers.iter().map(|p| p.pointer_id.as_str()).collect()
    }

    fn candidates() -> Vec<ContextPointer> {
        vec![pointer("aaa"), pointer("bbb"), pointer("ccc")]
    }

    #[tokio::test]
    async fn keeps_ranker_order_and_caps() {
        let ranker = StubRanker::answering(r#"{"pointer_ids": ["ccc", "aaa", "bbb"]}"#);
        let config = SelectorConfig {
            max_selected: 2,
            ..Default::default()
        };
        let selected = RelevanceSelector::new(&ranker, config)
            .select("q", &candidates())
            .await
            .unwrap();
        assert_eq!(ids(&selected), vec!["ccc", "aaa"]);
    }

    #[tokio::test]
    async fn drops_unknown_ids_before_capping() {
        let ranker =
            StubRanker::answering(r#"{"pointer_ids": ["zzz", "bbb", "yyy", "bbb", "aaa"]}"#);
        let config = SelectorConfig {
            max_selected: 2,
            ..Default::default()
        };
        let selected = RelevanceSelector::new(&ranker, config)
            .select("q", &candidates())
            .await
            .unwrap();
        assert_eq!(ids(&selected), vec!["bbb", "aaa"]);
    }

    #[tokio::test]
    async fn malformed_response_fails_closed() {
        let ranker = StubRanker::answering("all of them, obviously");
        let selected = RelevanceSelector::new(&ranker, SelectorConfig::default())
            .select("q", &candidates())
            .await
            .unwrap();
        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn ranker_error_fails_closed() {
        let ranker = StubRanker::failing("HTTP 503");
        let selected = RelevanceSelector::new(&ranker, SelectorConfig::default())
            .select("q", &candidates())
            .await
            .unwrap();
        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn timeout_fails_closed() {
        let mut ranker = StubRanker::answering(r#"{"pointer_ids": ["aaa"]}"#);
        ranker.delay = Some(Duration::from_secs(5));
        let config = SelectorConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let selected = RelevanceSelector::new(&ranker, config)
            .select("q", &candidates())
            .await
            .unwrap();
        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn fail_open_surfaces_errors() {
        let config = SelectorConfig {
            fail_closed: false,
            ..Default::default()
        };

        let ranker = StubRanker::failing("boom");
        let err = RelevanceSelector::new(&ranker, config.clone())
            .select("q", &candidates())
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::Ranker(ref m) if m == "boom"));

        let ranker = StubRanker::answering("{}");
        let err = RelevanceSelector::new(&ranker, config.clone())
            .select("q", &candidates())
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::Malformed(_)));

        let mut ranker = StubRanker::answering("{}");
        ranker.delay = Some(Duration::from_secs(5));
        let err = RelevanceSelector::new(
            &ranker,
            SelectorConfig {
                timeout: Duration::from_millis(10),
                ..config
            },
        )
        .select("q", &candidates())
        .await
        .unwrap_err();
        assert!(matches!(err, SelectionError::Timeout(_)));
    }

    #[tokio::test]
    async fn empty_candidates_skip_the_ranker() {
        let ranker = StubRanker::failing("should not be called");
        let config = SelectorConfig {
            fail_closed: false,
            ..Default::default()
        };
        let selected = RelevanceSelector::new(&ranker, config)
            .select("q", &[])
            .await
            .unwrap();
        assert!(selected.is_empty());
        assert!(ranker.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ranker_sees_only_ids_and_summaries() {
        let ranker = StubRanker::answering(r#"{"pointer_ids": []}"#);
        RelevanceSelector::new(&ranker, SelectorConfig::default())
            .select("q", &candidates())
            .await
            .unwrap();
        let seen = ranker.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].pointer_id, "aaa");
        assert_eq!(seen[0].summary, "search(id=\"aaa\")");
    }
}
