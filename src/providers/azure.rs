//! Azure-OpenAI-shaped completions provider.
//!
//! Deployment-scoped URL, `api-key` header, pinned api-version. Request
//! shaping is static: the relay is a pass-through, not a tuning surface.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::sanitize_api_error;
use super::traits::{ChatMessage, Provider, ProviderError};

const API_VERSION: &str = "2024-08-01-preview";
const MAX_COMPLETION_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AzureOpenAiProvider {
    endpoint: String,
    deployment: String,
    api_key: String,
    client: Client,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl AzureOpenAiProvider {
    pub fn new(endpoint: &str, deployment: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment: deployment.to_string(),
            api_key: api_key.to_string(),
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={API_VERSION}",
            self.endpoint, self.deployment
        )
    }
}

#[async_trait]
impl Provider for AzureOpenAiProvider {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let payload = serde_json::json!({
            "messages": messages,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": TEMPERATURE,
        });

        let response = self
            .client
            .post(self.chat_completions_url())
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Transport(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
            return Err(ProviderError::Api {
                provider: self.name().to_string(),
                status: status.as_u16(),
                detail: sanitize_api_error(&body),
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Malformed("no assistant content in choices".into()))
    }

    fn name(&self) -> &str {
        "azure-openai"
    }
}
