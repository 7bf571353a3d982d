//! # pdf-rag core
//!
//! Runtime-agnostic logic for the PDF retrieval pipeline: data models,
//! text normalization, sliding-window chunking, the error taxonomy,
//! provider traits (embedding, chat completion, vector store), the
//! in-memory vector store, and the indexing / answering flows built on
//! top of them.
//!
//! This crate contains no tokio, no HTTP client, and no filesystem I/O.
//! Concrete providers (OpenAI, Pinecone) and the server live in the
//! `pdf-rag` app crate.
//!
//! ```text
//! text ─▶ normalize ─▶ chunk ─▶ embed_batched ─▶ VectorStore::upsert
//!
//! question ─▶ embed ─▶ VectorStore::query ─▶ context ─▶ ChatProvider
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod indexer;
pub mod models;
pub mod normalize;
pub mod responder;
pub mod store;

pub use error::{RagError, Result};
