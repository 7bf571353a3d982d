//! TOML configuration parsing and validation.
//!
//! Every section is optional; omitted keys fall back to the defaults
//! below. Secrets are never read from the file: API keys come from the
//! environment (`OPENAI_API_KEY`, `PINECONE_API_KEY`), optionally loaded
//! from a `.env` file by the binary.
//!
//! ```toml
//! [chunking]
//! chunk_size = 1500
//! overlap = 200
//!
//! [retrieval]
//! top_k = 5
//! temperature = 0.2
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [vector_store]
//! backend = "pinecone"
//! index_name = "pdf-chatbot-index"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! ```

use anyhow::{Context, Result};
use pdf_rag_core::store::DistanceMetric;
use serde::Deserialize;
use std::path::Path;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1500
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            temperature: default_temperature(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_temperature() -> f32 {
    0.2
}
fn default_preview_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_api_base() -> String {
    OPENAI_API_BASE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_chat_model(),
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_generation_provider() -> String {
    "openai".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_generation_retries() -> u32 {
    3
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default = "default_cloud")]
    pub cloud: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
    #[serde(default = "default_store_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_control_plane")]
    pub control_plane_url: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            index_name: default_index_name(),
            metric: DistanceMetric::Cosine,
            cloud: default_cloud(),
            region: default_region(),
            ready_timeout_secs: default_ready_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            upsert_batch_size: default_upsert_batch_size(),
            max_retries: default_store_retries(),
            timeout_secs: default_timeout_secs(),
            control_plane_url: default_control_plane(),
        }
    }
}

fn default_backend() -> String {
    "pinecone".to_string()
}
fn default_index_name() -> String {
    "pdf-chatbot-index".to_string()
}
fn default_cloud() -> String {
    "aws".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_ready_timeout_secs() -> u64 {
    120
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_upsert_batch_size() -> usize {
    100
}
fn default_store_retries() -> u32 {
    3
}
fn default_control_plane() -> String {
    PINECONE_CONTROL_PLANE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

/// Read and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.retrieval.temperature) {
        anyhow::bail!("retrieval.temperature must be in [0.0, 2.0]");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.generation.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    // Validate vector store
    match config.vector_store.backend.as_str() {
        "pinecone" | "memory" => {}
        other => anyhow::bail!(
            "Unknown vector store backend: '{}'. Must be pinecone or memory.",
            other
        ),
    }
    if config.vector_store.index_name.trim().is_empty() {
        anyhow::bail!("vector_store.index_name must not be empty");
    }
    if config.vector_store.poll_interval_secs == 0 {
        anyhow::bail!("vector_store.poll_interval_secs must be > 0");
    }
    if config.vector_store.upsert_batch_size == 0 {
        anyhow::bail!("vector_store.upsert_batch_size must be > 0");
    }

    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    Ok(())
}
