//! Embedding provider implementations.
//!
//! - **[`DisabledEmbeddings`]**: always errors; used when embeddings are not configured.
//! - **[`OpenAIEmbeddings`]**: calls the OpenAI embeddings API through a [`RetryPolicy`].
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the provider named in config:
//!
//! ```rust,no_run
//! # use pdf_rag::config::EmbeddingConfig;
//! # use pdf_rag::embedding::create_provider;
//! let config = EmbeddingConfig {
//!     provider: "disabled".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use pdf_rag_core::models::EmbeddingVector;
use pdf_rag_core::RagError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::retry::RetryPolicy;

pub use pdf_rag_core::embedding::{embed_batched, embed_query, EmbeddingProvider};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledEmbeddings;

#[async_trait]
impl EmbeddingProvider for DisabledEmbeddings {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> pdf_rag_core::Result<Vec<EmbeddingVector>> {
        Err(RagError::EmbeddingProvider(
            "embedding provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI Provider ============

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding provider backed by `POST {api_base}/embeddings`.
pub struct OpenAIEmbeddings {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    dims: usize,
    retry: RetryPolicy,
}

impl OpenAIEmbeddings {
    /// Build from config, reading the key from `OPENAI_API_KEY`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(OPENAI_API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", OPENAI_API_KEY_ENV))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        if config.dims == 0 {
            bail!("embedding.dims must be > 0 for the OpenAI provider");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dims: config.dims,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> pdf_rag_core::Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let url = format!("{}/embeddings", self.api_base);
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .retry
            .send("openai embeddings", || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await
            .map_err(|e| RagError::EmbeddingProvider(e.to_string()))?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::EmbeddingProvider(format!("invalid response: {}", e)))?;

        let vectors = order_embeddings(parsed, texts.len(), self.dims)?;
        debug!(
            model = %self.model,
            inputs = texts.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "embedded texts"
        );
        Ok(vectors)
    }
}

/// Put response items back in input order and check their shape.
fn order_embeddings(
    parsed: EmbeddingResponse,
    expected: usize,
    dims: usize,
) -> pdf_rag_core::Result<Vec<EmbeddingVector>> {
    if parsed.data.len() != expected {
        return Err(RagError::EmbeddingProvider(format!(
            "expected {} embeddings, got {}",
            expected,
            parsed.data.len()
        )));
    }
    let mut slots: Vec<Option<EmbeddingVector>> = vec![None; expected];
    for item in parsed.data {
        if item.embedding.len() != dims {
            return Err(RagError::DimensionMismatch {
                expected: dims,
                actual: item.embedding.len(),
            });
        }
        let slot = slots.get_mut(item.index).ok_or_else(|| {
            RagError::EmbeddingProvider(format!("embedding index {} out of range", item.index))
        })?;
        *slot = Some(item.embedding);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| RagError::EmbeddingProvider(format!("missing embedding {}", i)))
        })
        .collect()
}

/// Create the [`EmbeddingProvider`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbeddings`] |
/// | `"openai"` | [`OpenAIEmbeddings`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbeddings)),
        "openai" => Ok(Box::new(OpenAIEmbeddings::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
