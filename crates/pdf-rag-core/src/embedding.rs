//! Embedding provider trait, the order-preserving batcher, and vector math.
//!
//! Concrete providers (OpenAI, disabled) live in the `pdf-rag` app crate.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::models::EmbeddingVector;

/// Default number of texts sent per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Trait for embedding backends.
///
/// `embed` must return exactly one vector per input text, in input order.
/// Failures are reported as [`RagError::EmbeddingProvider`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed one batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;
}

/// Embed `texts` in consecutive slices of at most `batch_size`.
///
/// One provider call per slice; results are concatenated in input order.
/// The whole call fails if any slice fails or returns the wrong number of
/// vectors. No retries happen here: transient-failure handling belongs to
/// the provider.
pub async fn embed_batched(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<EmbeddingVector>> {
    if batch_size == 0 {
        return Err(RagError::Configuration(
            "embedding batch_size must be > 0".to_string(),
        ));
    }

    let mut vectors = Vec::with_capacity(texts.len());
    for (batch_no, batch) in texts.chunks(batch_size).enumerate() {
        let embedded = provider.embed(batch).await.map_err(|e| match e {
            RagError::EmbeddingProvider(_) => e,
            other => RagError::EmbeddingProvider(other.to_string()),
        })?;
        if embedded.len() != batch.len() {
            return Err(RagError::EmbeddingProvider(format!(
                "batch {} returned {} vectors for {} inputs",
                batch_no,
                embedded.len(),
                batch.len()
            )));
        }
        debug!(batch = batch_no, size = batch.len(), "embedded batch");
        vectors.extend(embedded);
    }
    Ok(vectors)
}

/// Embed a single text, e.g. a question.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<EmbeddingVector> {
    embed_batched(provider, &[text.to_string()], 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RagError::EmbeddingProvider("empty embedding response".to_string()))
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Dot product of two vectors, or `0.0` when their lengths differ.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 distance between two vectors, or `f32::INFINITY` when their lengths differ.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
