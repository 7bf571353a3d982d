//! Fixed-size sliding-window text chunker.
//!
//! Splits normalized document text into overlapping [`Chunk`]s of at
//! most `chunk_size` characters. Consecutive windows share `overlap`
//! characters so a sentence cut at a window edge still appears whole in
//! one of its neighbours.
//!
//! Sizes are measured in Unicode scalar values, never bytes, so a window
//! boundary never lands inside a multi-byte code point.
//!
//! # Algorithm
//!
//! 1. `start = 0`.
//! 2. Take the window `[start, min(start + chunk_size, len))` and trim it.
//! 3. If the trimmed window is non-empty, emit it with the next ordinal id.
//! 4. Stop once the window reached the end of the text.
//! 5. Otherwise advance `start` by `chunk_size - overlap` and repeat.
//!
//! Ids are contiguous over *emitted* chunks: a whitespace-only window is
//! skipped without leaving a gap.
//!
//! # Example
//!
//! ```rust
//! use pdf_rag_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("The quick brown fox jumps over the lazy dog", 10, 3).unwrap();
//! assert_eq!(chunks[0].text, "The quick");
//! assert_eq!(chunks[1].text, "ck brown f");
//! assert_eq!(chunks[2].text, "n fox jump");
//! ```

use crate::error::{RagError, Result};
use crate::models::Chunk;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1500;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Reject parameters that would stall or invert the window.
pub fn validate_chunking(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(RagError::InvalidChunking {
            chunk_size,
            overlap,
        });
    }
    Ok(())
}

/// Split `text` into overlapping windows.
///
/// # Errors
///
/// - [`RagError::InvalidChunking`] unless `chunk_size > 0` and `overlap < chunk_size`.
/// - [`RagError::NoChunksProduced`] when every window trims to empty.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    validate_chunking(chunk_size, overlap)?;

    // Byte offset of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = boundaries.len() - 1;
    let step = chunk_size - overlap;

    let mut chunks = Vec::with_capacity(len / step + 1);
    let mut start = 0usize;

    while start < len {
        let end = (start + chunk_size).min(len);
        let window = text[boundaries[start]..boundaries[end]].trim();
        if !window.is_empty() {
            chunks.push(Chunk {
                id: chunks.len(),
                text: window.to_string(),
            });
        }
        if end == len {
            break;
        }
        start += step;
    }

    if chunks.is_empty() {
        return Err(RagError::NoChunksProduced);
    }
    Ok(chunks)
}
