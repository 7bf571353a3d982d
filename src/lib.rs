//! # pdf-rag
//!
//! Upload a PDF, index its text into a managed vector database under a
//! per-document namespace, and answer questions grounded in the chunks
//! most similar to each question.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────┐   ┌──────────┐
//! │  Upload  │──▶│ extract → normalize  │──▶│ Pinecone │
//! │ PDF bytes│   │ → chunk → embed      │   │ namespace│
//! └──────────┘   └──────────────────────┘   └────┬─────┘
//!                                                │ top-K
//!                ┌──────────────────────┐        │
//!  question ────▶│ embed → query →      │◀───────┘
//!                │ context → chat model │──▶ reply + references
//!                └──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types, re-exported from `pdf-rag-core` |
//! | [`normalize`] | Whitespace normalization |
//! | [`chunk`] | Sliding-window text chunker |
//! | [`extract`] | PDF text extraction and upload checks |
//! | [`retry`] | Exponential-backoff retry policy for HTTP calls |
//! | [`embedding`] | OpenAI embedding provider |
//! | [`generation`] | OpenAI chat-completion provider |
//! | [`pinecone`] | Pinecone vector store |
//! | [`pipeline`] | Wires providers and store into a ready context |
//! | [`server`] | HTTP server (Axum) with CORS |
//! | [`telemetry`] | Tracing subscriber setup |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod models;
pub mod normalize;
pub mod pinecone;
pub mod pipeline;
pub mod retry;
pub mod server;
pub mod telemetry;

pub use pdf_rag_core::{indexer, responder, store};
pub use pdf_rag_core::{RagError, Result};
