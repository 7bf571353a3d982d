//! Retrieval-augmented answering.
//!
//! Embeds the question, retrieves the nearest chunks from one namespace,
//! and asks the chat model to answer from those chunks alone. When the
//! namespace has nothing to offer, a fixed fallback reply is returned and
//! the chat model is never called.

use tracing::{debug, info};

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::generation::ChatProvider;
use crate::models::{Answer, ChatMessage, RetrievalMatch, ScoredVector};
use crate::store::{CollectionHandle, VectorStore};

pub const FALLBACK_REPLY: &str = "No relevant context found for that question.";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using only the \
provided context from a PDF document. If the context does not contain enough information to \
answer the question, say so clearly instead of guessing.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerOptions {
    pub top_k: usize,
    pub temperature: f32,
    pub preview_chars: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Turn raw store hits into ranked references.
pub fn rank_matches(hits: Vec<ScoredVector>, preview_chars: usize) -> Vec<RetrievalMatch> {
    hits.into_iter()
        .enumerate()
        .map(|(i, hit)| RetrievalMatch {
            rank: i + 1,
            score: hit.score,
            text_preview: hit.metadata.text.chars().take(preview_chars).collect(),
            source: hit.metadata.source,
            text: hit.metadata.text,
        })
        .collect()
}

/// `"Snippet 1: ..."` lines, one per match, in rank order.
pub fn build_context(matches: &[RetrievalMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("Snippet {}: {}", m.rank, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_messages(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Context:\n{}\n\nQuestion: {}\n\nAnswer using only the context above.",
            context, question
        )),
    ]
}

/// Answers questions against a provisioned collection.
pub struct Responder<'a> {
    embedder: &'a dyn EmbeddingProvider,
    store: &'a dyn VectorStore,
    chat: &'a dyn ChatProvider,
    handle: &'a CollectionHandle,
}

impl<'a> Responder<'a> {
    pub fn new(
        embedder: &'a dyn EmbeddingProvider,
        store: &'a dyn VectorStore,
        chat: &'a dyn ChatProvider,
        handle: &'a CollectionHandle,
    ) -> Self {
        Self {
            embedder,
            store,
            chat,
            handle,
        }
    }

    pub async fn answer(
        &self,
        question: &str,
        namespace: &str,
        opts: &AnswerOptions,
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        if opts.top_k == 0 {
            return Err(RagError::InvalidRequest("top_k must be >= 1".to_string()));
        }

        let query = embed_query(self.embedder, question).await?;
        let hits = self
            .store
            .query(self.handle, &query, namespace, opts.top_k)
            .await?;

        if hits.is_empty() {
            info!(namespace = %namespace, "no matches; returning fallback reply");
            return Ok(Answer {
                reply: FALLBACK_REPLY.to_string(),
                references: Vec::new(),
            });
        }

        let references = rank_matches(hits, opts.preview_chars);
        let context = build_context(&references);
        debug!(
            namespace = %namespace,
            matches = references.len(),
            context_chars = context.len(),
            "built context"
        );

        let messages = build_messages(&context, question);
        let reply = self
            .chat
            .complete(&messages, opts.temperature)
            .await
            .map_err(|e| match e {
                RagError::GenerationProvider(_) => e,
                other => RagError::GenerationProvider(other.to_string()),
            })?;

        Ok(Answer {
            reply: reply.trim().to_string(),
            references,
        })
    }
}
