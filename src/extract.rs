//! PDF text extraction.
//!
//! Callers supply bytes plus an optional content type; this module returns
//! plain UTF-8 text. Extraction never panics the caller: `pdf-extract` runs
//! on a blocking thread and a panic there surfaces as an error.

use pdf_rag_core::RagError;
use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";

/// Content types accepted for upload. Browsers and HTTP clients disagree
/// on how to label PDFs, so the generic binary types are allowed too.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    MIME_PDF,
    "application/x-pdf",
    "application/octet-stream",
    "binary/octet-stream",
];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("file is empty")]
    Empty,
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

impl From<ExtractError> for RagError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedContentType(_) | ExtractError::Empty => {
                RagError::InvalidRequest(err.to_string())
            }
            ExtractError::Pdf(msg) => RagError::Extraction(msg),
        }
    }
}

/// `true` if `content_type` (parameters ignored) is acceptable as a PDF.
/// A missing content type is accepted.
pub fn is_accepted_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            essence.is_empty() || ACCEPTED_CONTENT_TYPES.contains(&essence.as_str())
        }
    }
}

/// Check an upload before any parsing work is done.
pub fn check_upload(bytes: &[u8], content_type: Option<&str>) -> Result<(), ExtractError> {
    if !is_accepted_content_type(content_type) {
        return Err(ExtractError::UnsupportedContentType(
            content_type.unwrap_or_default().to_string(),
        ));
    }
    if bytes.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(())
}

/// Extract text synchronously.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::Empty);
    }
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Extract text on the blocking pool.
pub async fn extract_pdf_text_blocking(bytes: Vec<u8>) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
        .await
        .map_err(|e| ExtractError::Pdf(format!("extractor aborted: {}", e)))?
}
