//! Sliding-window text chunker, re-exported from `pdf-rag-core`.
//!
//! # Example
//!
//! ```rust
//! use pdf_rag::chunk::chunk_text;
//!
//! let chunks = chunk_text("Hello world. Second sentence.", 1500, 200).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].id, 0);
//! ```

pub use pdf_rag_core::chunk::*;
