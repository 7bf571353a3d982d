//! Data models used throughout the pipeline, re-exported from `pdf-rag-core`.
//!
//! Uploaded bytes become a [`SourceDocument`], which is split into
//! [`Chunk`]s, embedded into [`IndexedVector`]s, and later retrieved as
//! [`RetrievalMatch`]es attached to an [`Answer`].

pub use pdf_rag_core::models::*;
