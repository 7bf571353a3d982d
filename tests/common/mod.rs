//! Shared fixtures for integration tests: fake providers, a PDF builder,
//! and an in-memory pipeline.

#![allow(dead_code)]

use async_trait::async_trait;
use pdf_rag::config::{parse_config, Config};
use pdf_rag::embedding::EmbeddingProvider;
use pdf_rag::generation::ChatProvider;
use pdf_rag::models::{ChatMessage, EmbeddingVector};
use pdf_rag::pipeline::PipelineContext;
use pdf_rag::store::memory::InMemoryVectorStore;
use pdf_rag::store::VectorStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIMS: usize = 32;

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket.
/// Texts sharing words end up close under cosine similarity.
pub struct HashEmbedder {
    pub dims: usize,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vectorize(&self, text: &str) -> EmbeddingVector {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[hash as usize % self.dims] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-embedder"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> pdf_rag::Result<Vec<EmbeddingVector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

/// Chat provider that records every conversation and replies with a
/// fixed string.
pub struct RecordingChat {
    pub reply: String,
    pub calls: Mutex<Vec<(Vec<ChatMessage>, f32)>>,
}

impl RecordingChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for RecordingChat {
    fn model_name(&self) -> &str {
        "recording-chat"
    }
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> pdf_rag::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), temperature));
        Ok(self.reply.clone())
    }
}

/// Config with the in-memory backend and small chunks so short test
/// documents still produce several vectors.
pub fn test_config() -> Config {
    parse_config(
        r#"
[chunking]
chunk_size = 120
overlap = 20

[retrieval]
top_k = 3

[embedding]
provider = "disabled"
dims = 32
batch_size = 4

[generation]
provider = "disabled"

[vector_store]
backend = "memory"
index_name = "test-index"

[server]
bind = "127.0.0.1:0"
max_upload_bytes = 1048576
"#,
    )
    .unwrap()
}

pub struct TestPipeline {
    pub pipeline: Arc<PipelineContext>,
    pub embedder: Arc<HashEmbedder>,
    pub chat: Arc<RecordingChat>,
    pub store: Arc<InMemoryVectorStore>,
}

pub async fn memory_pipeline(config: &Config) -> TestPipeline {
    let embedder = Arc::new(HashEmbedder::new(DIMS));
    let chat = Arc::new(RecordingChat::new("  Grounded answer.\n"));
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = PipelineContext::from_parts(
        config,
        embedder.clone(),
        chat.clone(),
        store.clone() as Arc<dyn VectorStore>,
    )
    .await
    .unwrap();
    TestPipeline {
        pipeline: Arc::new(pipeline),
        embedder,
        chat,
        store,
    }
}

/// Minimal valid single-page PDF with one text line per entry.
/// Builds body then xref with correct byte offsets so pdf-extract can parse it.
pub fn minimal_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT /F1 12 Tf 72 720 Td ");
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            content.push_str("0 -16 Td ");
        }
        content.push_str(&format!("({}) Tj ", line));
    }
    content.push_str("ET");

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// A PDF with no text operators at all.
pub fn blank_pdf() -> Vec<u8> {
    minimal_pdf(&[])
}

pub const RUST_LINES: &[&str] = &[
    "Rust guarantees memory safety through ownership and borrowing.",
    "Every value has a single owner and is dropped when the owner goes out of scope.",
    "The borrow checker rejects dangling references at compile time.",
    "Cargo is the Rust package manager and build tool.",
    "Crates are published to the crates.io registry.",
];

pub const GARDEN_LINES: &[&str] = &[
    "Tomatoes need six hours of direct sunlight every day.",
    "Water the garden early in the morning to reduce evaporation.",
    "Compost improves soil structure and feeds earthworms.",
];
