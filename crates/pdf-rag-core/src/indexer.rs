//! Document indexing: normalize → chunk → embed → upsert.
//!
//! Each stage either succeeds completely or fails the whole call. The
//! upsert is awaited before a report is returned, so a successful
//! [`IngestReport`] means every chunk is queryable.

use chrono::Utc;
use tracing::info;

use crate::chunk::{chunk_text, validate_chunking, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedding::{embed_batched, EmbeddingProvider, DEFAULT_BATCH_SIZE};
use crate::error::{RagError, Result};
use crate::models::{IndexedVector, IngestReport, SourceDocument, VectorMetadata};
use crate::normalize::normalize_text;
use crate::store::{CollectionHandle, VectorStore};

/// Chunking and batching parameters for one indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub batch_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Writes documents into a provisioned collection.
pub struct Indexer<'a> {
    embedder: &'a dyn EmbeddingProvider,
    store: &'a dyn VectorStore,
    handle: &'a CollectionHandle,
}

impl<'a> Indexer<'a> {
    pub fn new(
        embedder: &'a dyn EmbeddingProvider,
        store: &'a dyn VectorStore,
        handle: &'a CollectionHandle,
    ) -> Self {
        Self {
            embedder,
            store,
            handle,
        }
    }

    pub async fn index(&self, doc: &SourceDocument, opts: &IndexOptions) -> Result<IngestReport> {
        validate_chunking(opts.chunk_size, opts.overlap)?;

        let text = normalize_text(&doc.text)?;
        let chunks = chunk_text(&text, opts.chunk_size, opts.overlap)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let values = embed_batched(self.embedder, &texts, opts.batch_size).await?;

        let ingested_at = Utc::now();
        let vectors: Vec<IndexedVector> = chunks
            .into_iter()
            .zip(values)
            .map(|(chunk, values)| IndexedVector {
                id: IndexedVector::vector_id(&doc.doc_id, chunk.id),
                values,
                metadata: VectorMetadata {
                    text: chunk.text,
                    source: doc.source.clone(),
                    doc_id: doc.doc_id.clone(),
                    chunk_id: chunk.id,
                    ingested_at: Some(ingested_at),
                },
            })
            .collect();

        let written = self
            .store
            .upsert(self.handle, &vectors, &doc.namespace)
            .await?;
        if written != vectors.len() {
            return Err(RagError::VectorStore(format!(
                "store wrote {} of {} vectors",
                written,
                vectors.len()
            )));
        }

        info!(
            doc_id = %doc.doc_id,
            namespace = %doc.namespace,
            chunks = written,
            chars = text.chars().count(),
            "indexed document"
        );

        Ok(IngestReport {
            doc_id: doc.doc_id.clone(),
            namespace: doc.namespace.clone(),
            chunks_indexed: vectors.len(),
            source: doc.source.clone(),
        })
    }
}
