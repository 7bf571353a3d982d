//! Chat-completion provider trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ChatMessage;

/// Trait for chat-completion backends.
///
/// Implementations report failures as
/// [`RagError::GenerationProvider`](crate::error::RagError::GenerationProvider).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Send the conversation and return the assistant's reply text.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}
