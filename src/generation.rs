//! Chat-completion provider implementations.
//!
//! [`OpenAIChat`] calls `POST {api_base}/chat/completions`;
//! [`DisabledChat`] always errors. Use [`create_chat_provider`] to pick
//! one from config.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use pdf_rag_core::models::ChatMessage;
use pdf_rag_core::RagError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GenerationConfig;
use crate::embedding::OPENAI_API_KEY_ENV;
use crate::retry::RetryPolicy;

pub use pdf_rag_core::generation::ChatProvider;

pub struct DisabledChat;

#[async_trait]
impl ChatProvider for DisabledChat {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _messages: &[ChatMessage], _temperature: f32) -> pdf_rag_core::Result<String> {
        Err(RagError::GenerationProvider(
            "generation provider is disabled".to_string(),
        ))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAIChat {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    retry: RetryPolicy,
}

impl OpenAIChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(OPENAI_API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", OPENAI_API_KEY_ENV))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl ChatProvider for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> pdf_rag_core::Result<String> {
        let started = Instant::now();
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let response = self
            .retry
            .send("openai chat", || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await
            .map_err(|e| RagError::GenerationProvider(e.to_string()))?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RagError::GenerationProvider(format!("invalid response: {}", e)))?;

        let reply = first_reply(parsed)?;
        info!(
            model = %self.model,
            latency_ms = started.elapsed().as_millis() as u64,
            reply_chars = reply.len(),
            "chat completion finished"
        );
        Ok(reply)
    }
}

fn first_reply(parsed: ChatCompletionResponse) -> pdf_rag_core::Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| RagError::GenerationProvider("response contained no choices".to_string()))
}

pub fn create_chat_provider(config: &GenerationConfig) -> Result<Box<dyn ChatProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledChat)),
        "openai" => Ok(Box::new(OpenAIChat::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
