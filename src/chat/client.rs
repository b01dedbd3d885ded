//! HTTP client for the session store service.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::providers::ChatMessage;

/// Typed client for the session service's message endpoints.
#[derive(Clone)]
pub struct SessionServiceClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Deserialize)]
struct StoredMessage {
    role: String,
    content: String,
}

impl SessionServiceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Conversation history in replay order (oldest first, as the session
    /// service returns it). A non-success status degrades to an empty
    /// history — a missing transcript must not block the conversation —
    /// while an unreachable service is a hard error.
    pub async fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let url = format!("{}/sessions/{session_id}/messages", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("session service unreachable")?;

        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                session_id,
                "history fetch failed; continuing with empty history"
            );
            return Ok(Vec::new());
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("invalid history payload from session service")?;
        Ok(parsed
            .messages
            .into_iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content,
            })
            .collect())
    }

    /// Record one turn. Write rejections are logged, not fatal; transport
    /// failures propagate.
    pub async fn append(&self, session_id: &str, role: &str, content: &str) -> Result<()> {
        let url = format!("{}/sessions/{session_id}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({"role": role, "content": content}))
            .send()
            .await
            .context("session service unreachable")?;

        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                session_id,
                role,
                "session service rejected message write"
            );
        }
        Ok(())
    }
}
