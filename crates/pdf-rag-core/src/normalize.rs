//! Whitespace normalization for extracted document text.

use crate::error::{RagError, Result};

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// Fails with [`RagError::EmptyDocument`] when nothing but whitespace remains.
///
/// ```rust
/// use pdf_rag_core::normalize::normalize_text;
///
/// assert_eq!(normalize_text("Hello\n\n  world\t!").unwrap(), "Hello world !");
/// ```
pub fn normalize_text(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        return Err(RagError::EmptyDocument);
    }
    Ok(out)
}
