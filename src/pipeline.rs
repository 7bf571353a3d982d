//! Pipeline context: the providers, the vector store, and the provisioned
//! collection handle, wired together once and shared by every request.
//!
//! Construction runs [`VectorStore::ensure_ready`] exactly once and keeps
//! the resulting [`CollectionHandle`]; nothing is cached in process-global
//! state, so tests can build as many independent contexts as they like.

use std::sync::Arc;

use anyhow::{bail, Result};
use pdf_rag_core::indexer::{IndexOptions, Indexer};
use pdf_rag_core::models::{Answer, IngestReport, SourceDocument};
use pdf_rag_core::responder::{AnswerOptions, Responder};
use pdf_rag_core::store::memory::InMemoryVectorStore;
use pdf_rag_core::store::{CollectionHandle, CollectionSpec, NamespaceStats, VectorStore};
use pdf_rag_core::RagError;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::extract::{check_upload, extract_pdf_text_blocking};
use crate::generation::{create_chat_provider, ChatProvider};
use crate::pinecone::PineconeStore;

pub const DEFAULT_SOURCE_NAME: &str = "uploaded.pdf";

/// An uploaded PDF awaiting ingestion.
#[derive(Debug, Clone, Default)]
pub struct PdfUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub namespace: Option<String>,
}

/// Per-request overrides for [`PipelineContext::answer`].
#[derive(Debug, Clone, Default)]
pub struct QueryOverrides {
    pub top_k: Option<usize>,
    pub temperature: Option<f32>,
}

pub struct PipelineContext {
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    store: Arc<dyn VectorStore>,
    handle: CollectionHandle,
    index_options: IndexOptions,
    answer_options: AnswerOptions,
}

/// Collection spec implied by config plus the embedder's dimension.
pub fn collection_spec(config: &Config, dimension: usize) -> CollectionSpec {
    CollectionSpec {
        name: config.vector_store.index_name.clone(),
        dimension,
        metric: config.vector_store.metric,
        cloud: config.vector_store.cloud.clone(),
        region: config.vector_store.region.clone(),
    }
}

/// Instantiate the vector store backend named in config.
pub fn create_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    match config.vector_store.backend.as_str() {
        "pinecone" => Ok(Arc::new(PineconeStore::new(&config.vector_store)?)),
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        other => bail!("Unknown vector store backend: {}", other),
    }
}

impl PipelineContext {
    /// Build providers from config, provision the collection, and return
    /// a ready context.
    pub async fn connect(config: &Config) -> Result<Self> {
        if !config.embedding.is_enabled() {
            bail!("embedding.provider is 'disabled'; ingestion and queries need an embedding provider");
        }
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        let chat: Arc<dyn ChatProvider> = Arc::from(create_chat_provider(&config.generation)?);
        let store = create_store(config)?;
        Ok(Self::from_parts(config, embedder, chat, store).await?)
    }

    /// Assemble a context from already-built parts and provision the collection.
    pub async fn from_parts(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        store: Arc<dyn VectorStore>,
    ) -> pdf_rag_core::Result<Self> {
        let spec = collection_spec(config, embedder.dims());
        let handle = store.ensure_ready(&spec).await?;
        if handle.dimension != embedder.dims() {
            return Err(RagError::DimensionMismatch {
                expected: handle.dimension,
                actual: embedder.dims(),
            });
        }
        info!(
            collection = %handle.name,
            dimension = handle.dimension,
            embedder = embedder.model_name(),
            chat = chat.model_name(),
            "pipeline ready"
        );

        Ok(Self {
            embedder,
            chat,
            store,
            handle,
            index_options: IndexOptions {
                chunk_size: config.chunking.chunk_size,
                overlap: config.chunking.overlap,
                batch_size: config.embedding.batch_size,
            },
            answer_options: AnswerOptions {
                top_k: config.retrieval.top_k,
                temperature: config.retrieval.temperature,
                preview_chars: config.retrieval.preview_chars,
            },
        })
    }

    pub fn handle(&self) -> &CollectionHandle {
        &self.handle
    }

    /// Index already-extracted text.
    pub async fn ingest_text(&self, doc: &SourceDocument) -> pdf_rag_core::Result<IngestReport> {
        Indexer::new(self.embedder.as_ref(), self.store.as_ref(), &self.handle)
            .index(doc, &self.index_options)
            .await
    }

    /// Validate, extract, and index an uploaded PDF.
    ///
    /// A fresh UUID v4 becomes the document id; the namespace defaults to
    /// that id when the caller does not supply one.
    pub async fn ingest_pdf(&self, upload: PdfUpload) -> pdf_rag_core::Result<IngestReport> {
        check_upload(&upload.bytes, upload.content_type.as_deref())?;

        let doc_id = Uuid::new_v4().to_string();
        let namespace = upload
            .namespace
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| doc_id.clone());
        let source = upload
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string());

        info!(doc_id = %doc_id, namespace = %namespace, bytes = upload.bytes.len(), "ingesting PDF");
        let text = extract_pdf_text_blocking(upload.bytes).await?;

        self.ingest_text(&SourceDocument {
            doc_id,
            namespace,
            source,
            text,
        })
        .await
    }

    pub async fn answer(
        &self,
        question: &str,
        namespace: &str,
        overrides: &QueryOverrides,
    ) -> pdf_rag_core::Result<Answer> {
        if namespace.trim().is_empty() {
            return Err(RagError::InvalidRequest(
                "namespace must not be empty".to_string(),
            ));
        }
        let mut opts = self.answer_options;
        if let Some(top_k) = overrides.top_k {
            opts.top_k = top_k;
        }
        if let Some(temperature) = overrides.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(RagError::InvalidRequest(
                    "temperature must be in [0.0, 2.0]".to_string(),
                ));
            }
            opts.temperature = temperature;
        }
        Responder::new(
            self.embedder.as_ref(),
            self.store.as_ref(),
            self.chat.as_ref(),
            &self.handle,
        )
        .answer(question, namespace.trim(), &opts)
        .await
    }

    pub async fn namespace_stats(&self, namespace: &str) -> pdf_rag_core::Result<NamespaceStats> {
        self.store.namespace_stats(&self.handle, namespace).await
    }
}
