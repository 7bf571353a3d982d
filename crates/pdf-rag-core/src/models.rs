//! Data types that flow through ingestion and retrieval.
//!
//! Vector metadata is a typed record rather than an open map, so every
//! stored vector carries the same fields and the responder never has to
//! guess at key names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Dense embedding vector. Dimensionality is fixed system-wide.
pub type EmbeddingVector = Vec<f32>;

/// A contiguous segment of normalized document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based ordinal, contiguous over the chunks actually emitted.
    pub id: usize,
    /// Trimmed, never empty.
    pub text: String,
}

/// Metadata stored alongside every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub text: String,
    pub source: String,
    pub doc_id: String,
    #[serde(deserialize_with = "deserialize_ordinal")]
    pub chunk_id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<DateTime<Utc>>,
}

/// Vector stores commonly hand numeric metadata back as floats (`3.0`).
fn deserialize_ordinal<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw < 0.0 || raw.fract() != 0.0 {
        return Err(serde::de::Error::custom(format!(
            "chunk_id must be a non-negative integer, got {}",
            raw
        )));
    }
    Ok(raw as usize)
}

/// A vector ready for upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector {
    /// Unique across the collection: `"{doc_id}-{chunk_id}"`.
    pub id: String,
    pub values: EmbeddingVector,
    pub metadata: VectorMetadata,
}

impl IndexedVector {
    pub fn vector_id(doc_id: &str, chunk_id: usize) -> String {
        format!("{}-{}", doc_id, chunk_id)
    }
}

/// A raw nearest-neighbour hit as returned by a vector store.
#[derive(Debug, Clone)]
pub struct ScoredVector {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// A ranked reference attached to an answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalMatch {
    /// 1-based position in the result list.
    pub rank: usize,
    pub score: f32,
    pub text_preview: String,
    pub source: String,
    #[serde(skip)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Reply plus the references it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub reply: String,
    pub references: Vec<RetrievalMatch>,
}

/// A document's extracted text, ready for indexing.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub doc_id: String,
    pub namespace: String,
    /// Human-readable origin, usually the uploaded file name.
    pub source: String,
    pub text: String,
}

/// Outcome of indexing one document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub doc_id: String,
    pub namespace: String,
    pub chunks_indexed: usize,
    pub source: String,
}
