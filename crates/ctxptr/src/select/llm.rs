//! Model-backed ranker over the chat completions client.

use super::ranker::{RankCandidate, RankFuture, Ranker};
use crate::client::{ChatRequest, Message, OpenRouterClient, ResponseFormat, ResponseFormatType};

/// Instructions for the ranking model.
const SELECTION_PROMPT: &str = "\
You select which stored tool results are relevant to a user's query.

You are given the query and a list of candidates, one per line, as `[pointer_id] summary`.
Return ONLY a JSON object of the form {\"pointer_ids\": [\"<id>\", ...]} listing the ids
of relevant candidates, most relevant first.

Rules:
- Use only ids from the list. Never invent ids.
- Leave out candidates that do not help answer the query.
- Return {\"pointer_ids\": []} if nothing is relevant.";

/// Maximum tokens for the ranking response.
const SELECTION_MAX_TOKENS: u32 = 512;

/// Asks a chat model to pick relevant pointers.
///
/// The model only ever sees ids and summaries. Its text answer is returned
/// as-is; the selector validates it.
pub struct LlmRanker<'c> {
    client: &'c OpenRouterClient,
    model: String,
}

impl<'c> LlmRanker<'c> {
    pub fn new(client: &'c OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request sent for one ranking call.
    pub fn build_request(&self, query: &str, candidates: &[RankCandidate]) -> ChatRequest {
        let mut listing = String::new();
        for c in candidates {
            listing.push_str(&format!("[{}] {}\n", c.pointer_id, c.summary));
        }
        let user = format!("Query:\n{query}\n\nCandidates:\n{listing}");

        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::system(SELECTION_PROMPT), Message::user(user)],
            max_tokens: SELECTION_MAX_TOKENS,
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                fmt_type: ResponseFormatType::JsonObject,
            }),
        }
    }
}

impl Ranker for LlmRanker<'_> {
    fn rank<'a>(&'a self, query: &'a str, candidates: &'a [RankCandidate]) -> RankFuture<'a> {
        let request = self.build_request(query, candidates);
        Box::pin(async move {
            let completion = self.client.chat(&request).await?;
            completion
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| "ranking model returned empty content".to_string())
        })
    }

    fn name(&self) -> &str {
        "llm"
    }
}
