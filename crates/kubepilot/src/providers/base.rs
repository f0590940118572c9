use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::models::message::Message;

/// Token accounting reported for one completion call, named after the
/// `usage` object of the chat completions wire format. Every field is
/// optional: compatible endpoints frequently omit some or all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

/// A chat completion backend. Implementations own their endpoint protocol
/// and retry policy; the reasoning loop only sees this trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Perform one chat completion request.
    ///
    /// # Arguments
    /// * `model` - Model (or deployment) identifier
    /// * `max_tokens` - Completion token cap, skipped when zero
    /// * `messages` - The conversation history, system message first
    ///
    /// # Returns
    /// The assistant's reply text and usage statistics. Transient transport
    /// and provider errors are retried internally; errors returned here are
    /// terminal.
    async fn complete(
        &self,
        model: &str,
        max_tokens: i32,
        messages: &[Message],
    ) -> Result<(String, Usage), ProviderError>;
}
