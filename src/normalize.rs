//! Whitespace normalization, re-exported from `pdf-rag-core`.

pub use pdf_rag_core::normalize::*;
