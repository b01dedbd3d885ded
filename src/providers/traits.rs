//! Provider trait and wire types for completion backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single turn in the completions request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// Failure modes of a completion call, kept typed so the relay can map
/// timeouts to 504 and everything else to 500.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("completion request timed out")]
    Timeout,
    #[error("{provider} API error ({status}): {detail}")]
    Api {
        provider: String,
        status: u16,
        detail: String,
    },
    #[error("completion transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// A model inference backend: takes the full message replay, returns the
/// assistant's reply text.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;

    /// The name of this provider implementation.
    fn name(&self) -> &str;
}
