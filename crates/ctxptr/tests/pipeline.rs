//! End-to-end: save → list → select → format against a temp directory.

use ctxptr::format::TRUNCATION_MARKER;
use ctxptr::prelude::*;
use serde_json::{Map, Value, json};
use std::sync::Mutex;

/// Answers with a fixed id list and remembers the query it was asked.
struct ScriptedRanker {
    ids: Vec<String>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedRanker {
    fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl Ranker for ScriptedRanker {
    fn rank<'a>(&'a self, query: &'a str, _candidates: &'a [RankCandidate]) -> RankFuture<'a> {
        self.queries.lock().unwrap().push(query.to_string());
        let body = json!({ "pointer_ids": self.ids }).to_string();
        Box::pin(async move { Ok(body) })
    }
}

fn search_args(query: &str) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("query".into(), json!(query));
    args
}

#[tokio::test]
async fn save_list_select_format() {
    let dir = tempfile::tempdir().unwrap();
    let store = PointerStore::new(dir.path());

    let saved: Vec<ContextPointer> = ["tokio scheduler", "async traits", "pin projection"]
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let result = json!({
                "query": q,
                "body": format!("{}{}", i, "lorem ipsum ".repeat(40)),
            });
            store.save("q1", None, "search", &search_args(q), &result).unwrap()
        })
        .collect();

    let listed = store.list("q1").unwrap();
    assert_eq!(listed, saved);
    assert!(store.list("q2").unwrap().is_empty());

    // The ranker wants everything, in reverse; the cap keeps the first two.
    let ranker = ScriptedRanker::new(saved.iter().rev().map(|p| p.pointer_id.clone()).collect());
    let config = PointerConfig::default().with_max_selected(2);
    let selected = RelevanceSelector::new(&ranker, config.selector.clone())
        .select("how do I write async rust?", &listed)
        .await
        .unwrap();
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].pointer_id, saved[2].pointer_id);
    assert_eq!(selected[1].pointer_id, saved[1].pointer_id);

    // Budget: all of the first block plus a little of the second.
    let first = ContextFormatter::new(&store, FormatterConfig { max_chars: 100_000 })
        .format(&selected[..1])
        .unwrap();
    let max_chars = first.chars().count() + 120;
    let text = ContextFormatter::new(&store, FormatterConfig { max_chars })
        .format(&selected)
        .unwrap();

    assert!(text.chars().count() <= max_chars);
    assert!(text.starts_with(&first));
    assert!(text.contains(&format!("[{}]", selected[1].pointer_id)));
    assert!(text.ends_with(TRUNCATION_MARKER));
    assert!(!text.contains(&saved[0].pointer_id));
}

#[tokio::test]
async fn build_context_fails_closed_on_bad_ranker_output() {
    struct Chatty;

    impl Ranker for Chatty {
        fn rank<'a>(&'a self, _q: &'a str, _c: &'a [RankCandidate]) -> RankFuture<'a> {
            Box::pin(async { Ok("Sure! Here are the relevant ones: all of them.".to_string()) })
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let store = PointerStore::new(dir.path());
    store
        .save("q1", None, "search", &search_args("x"), &json!("payload"))
        .unwrap();

    let config = PointerConfig::default();
    let text = build_context(&store, &Chatty, &config, "q1", "anything")
        .await
        .unwrap();
    assert!(text.is_empty());

    let strict = PointerConfig::default().with_fail_closed(false);
    let err = build_context(&store, &Chatty, &strict, "q1", "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::Selection(SelectionError::Malformed(_))));
}

#[tokio::test]
async fn keyword_ranker_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = PointerStore::new(dir.path());
    store
        .save("q1", None, "search", &search_args("tokio runtime internals"), &json!("RUNTIME"))
        .unwrap();
    store
        .save("q1", None, "prices", &{
            let mut a = Map::new();
            a.insert("symbol".into(), json!("AAPL"));
            a
        }, &json!("PRICES"))
        .unwrap();

    let config = PointerConfig::default();
    let text = build_context(&store, &KeywordRanker::new(), &config, "q1", "tokio runtime")
        .await
        .unwrap();
    assert!(text.contains("RUNTIME"));
    assert!(!text.contains("PRICES"));

    let none = build_context(&store, &KeywordRanker::new(), &config, "unknown", "tokio")
        .await
        .unwrap();
    assert!(none.is_empty());
}
