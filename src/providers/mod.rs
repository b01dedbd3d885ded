//! Provider subsystem for the completions backend.
//!
//! One implementation today ([`azure::AzureOpenAiProvider`]); the
//! [`Provider`] trait is the seam a second backend would plug into.

pub mod azure;
pub mod traits;

pub use traits::{ChatMessage, Provider, ProviderError};

use crate::config::OpenAiConfig;

const MAX_API_ERROR_CHARS: usize = 200;

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from upstream error strings.
/// Provider error bodies sometimes echo the credential back.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 2] = ["sk-", "api-key="];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize upstream API error text: scrub secrets, bound the length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Resolve the API key from config or the environment.
fn resolve_credential(config: &OpenAiConfig) -> Option<String> {
    if let Some(key) = config.api_key.as_deref() {
        let key = key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Some(key);
        }
    }
    None
}

/// Factory: create the completions provider from config.
///
/// Endpoint and credential are hard requirements; the relay refuses to
/// start without them rather than failing on the first request.
pub fn create_provider(config: &OpenAiConfig) -> anyhow::Result<Box<dyn Provider>> {
    let endpoint = config
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("openai.endpoint must be set (config or OPENAI_ENDPOINT)")
        })?;
    let api_key = resolve_credential(config).ok_or_else(|| {
        anyhow::anyhow!("openai.api_key must be set (config or OPENAI_API_KEY)")
    })?;

    Ok(Box::new(azure::AzureOpenAiProvider::new(
        endpoint,
        &config.deployment,
        &api_key,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> OpenAiConfig {
        OpenAiConfig {
            endpoint: Some("https://res.openai.azure.com".into()),
            api_key: Some("provider-test-credential".into()),
            deployment: "gpt-4o-mini".into(),
        }
    }

    #[test]
    fn factory_builds_provider_when_configured() {
        let provider = create_provider(&configured()).unwrap();
        assert_eq!(provider.name(), "azure-openai");
    }

    #[test]
    fn factory_requires_endpoint() {
        let mut config = configured();
        config.endpoint = None;
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("openai.endpoint"));
    }

    #[test]
    fn factory_requires_credential() {
        let mut config = configured();
        config.api_key = Some("   ".into());
        // Leave OPENAI_API_KEY unset in the test environment.
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(create_provider(&config).is_err());
        }
    }

    // ── API error sanitization ───────────────────────────────

    #[test]
    fn sanitize_scrubs_sk_prefix() {
        let input = "request failed: sk-1234567890abcdef";
        let out = sanitize_api_error(input);
        assert!(!out.contains("sk-1234567890abcdef"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn sanitize_truncates_long_error() {
        let long = "a".repeat(400);
        let result = sanitize_api_error(&long);
        assert!(result.len() <= 203);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn sanitize_no_secret_no_change() {
        let input = "simple upstream timeout";
        assert_eq!(sanitize_api_error(input), input);
    }

    #[test]
    fn scrub_handles_multiple_occurrences() {
        let input = "keys sk-abcdef and sk-ghijkl";
        let result = scrub_secret_patterns(input);
        assert_eq!(result, "keys [REDACTED] and [REDACTED]");
    }
}
