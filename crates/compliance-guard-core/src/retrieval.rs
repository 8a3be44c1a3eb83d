//! Per-analysis question answering over a single document.
//!
//! A [`DocumentSession`] splits the document into overlapping chunks, picks
//! the chunks that best match a query and asks the language model to answer
//! from those excerpts. Conversation history lives in the session and is
//! dropped with it.

use std::{cmp::Reverse, collections::VecDeque, sync::Arc};

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};

static QUERY_TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("query term regex is valid"));

const MIN_TERM_CHARS: usize = 3;

const SYSTEM_PREAMBLE: &str = "You are a compliance analyst reviewing a policy document. \
Answer using only the document excerpts below. If the excerpts do not cover the question, say so.";

/// Stateful question answering bound to one document.
#[async_trait]
pub trait QaSession: Send {
    async fn answer(&mut self, query: &str) -> Result<String>;
}

/// Chunking, ranking and history limits for a [`DocumentSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Excerpts passed to the model per question.
    pub top_k: usize,
    /// Question/answer exchanges remembered by the session.
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            history_turns: 6,
        }
    }
}

/// Retrieval session over one document's text.
pub struct DocumentSession {
    client: Arc<dyn LlmClient>,
    chunks: Vec<String>,
    /// Lowercased copies of `chunks`, matched against lowercased query terms.
    folded: Vec<String>,
    history: VecDeque<(String, String)>,
    config: RetrievalConfig,
}

impl DocumentSession {
    pub fn new(client: Arc<dyn LlmClient>, text: &str, config: RetrievalConfig) -> Self {
        let chunks = split_chunks(text, config.chunk_size, config.chunk_overlap);
        let folded = chunks.iter().map(|chunk| chunk.to_lowercase()).collect();
        debug!(chunks = chunks.len(), "indexed document for retrieval");
        Self {
            client,
            chunks,
            folded,
            history: VecDeque::with_capacity(config.history_turns),
            config,
        }
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Chunks most relevant to `query`, best first. Chunks with equal hit
    /// counts keep document order, so a query with no hits yields the start
    /// of the document.
    pub fn retrieve(&self, query: &str) -> Vec<&str> {
        let hits = match term_matcher(query) {
            Some(matcher) => self
                .folded
                .iter()
                .map(|chunk| matcher.find_iter(chunk.as_str()).count())
                .collect(),
            None => vec![0; self.chunks.len()],
        };
        let mut ranked: Vec<usize> = (0..self.chunks.len()).collect();
        ranked.sort_by_key(|&index| Reverse(hits[index]));
        ranked
            .into_iter()
            .take(self.config.top_k)
            .map(|index| self.chunks[index].as_str())
            .collect()
    }

    fn build_request(&self, query: &str) -> CompletionRequest {
        let excerpts = self.retrieve(query);
        let mut system = String::from(SYSTEM_PREAMBLE);
        if excerpts.is_empty() {
            system.push_str("\n\nThe document contains no text.");
        }
        for (position, excerpt) in excerpts.iter().enumerate() {
            system.push_str(&format!("\n\n[Excerpt {}]\n{}", position + 1, excerpt));
        }

        let mut messages = Vec::with_capacity(self.history.len() * 2 + 1);
        for (question, answer) in &self.history {
            messages.push(ChatMessage::user(question.as_str()));
            messages.push(ChatMessage::assistant(answer.as_str()));
        }
        messages.push(ChatMessage::user(query));

        CompletionRequest {
            system: Some(system),
            messages,
        }
    }

    fn remember(&mut self, query: &str, answer: &str) {
        if self.config.history_turns == 0 {
            return;
        }
        while self.history.len() >= self.config.history_turns {
            self.history.pop_front();
        }
        self.history.push_back((query.to_string(), answer.to_string()));
    }
}

#[async_trait]
impl QaSession for DocumentSession {
    #[instrument(name = "session_answer", skip_all)]
    async fn answer(&mut self, query: &str) -> Result<String> {
        let request = self.build_request(query);
        let answer = self
            .client
            .complete(&request)
            .await
            .context("failed to generate an answer from the document")?;
        self.remember(query, &answer);
        Ok(answer)
    }
}

fn term_matcher(query: &str) -> Option<AhoCorasick> {
    let mut terms: Vec<String> = Vec::new();
    for term in QUERY_TERM.find_iter(query) {
        let term = term.as_str().to_lowercase();
        if term.chars().count() >= MIN_TERM_CHARS && !terms.contains(&term) {
            terms.push(term);
        }
    }
    if terms.is_empty() {
        return None;
    }
    AhoCorasick::new(&terms).ok()
}

/// Split `text` into windows of `size` characters, each starting
/// `size - overlap` characters after the previous one.
pub fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
