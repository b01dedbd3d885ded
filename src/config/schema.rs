use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level chatrelay configuration, loaded from `config.toml`.
///
/// Resolution order: `CHATRELAY_CONFIG_DIR` env → `~/.chatrelay/config.toml`.
/// Every deployment-facing knob also has an environment override applied
/// after load (see [`Config::apply_env_overrides`]), matching the variable
/// names the services have always been deployed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Persistence backend connection (`[redis]`).
    #[serde(default)]
    pub redis: RedisConfig,

    /// Session store HTTP service bind address (`[session_service]`).
    #[serde(default)]
    pub session_service: SessionServiceConfig,

    /// Completion relay HTTP service settings (`[chat]`).
    #[serde(default)]
    pub chat: ChatConfig,

    /// Upstream completions API settings (`[openai]`).
    #[serde(default)]
    pub openai: OpenAiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            redis: RedisConfig::default(),
            session_service: SessionServiceConfig::default(),
            chat: ChatConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

// ── Redis ────────────────────────────────────────────────────────

/// Redis connection configuration (`[redis]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host (default: localhost). Env: `REDIS_HOST`.
    #[serde(default = "default_redis_host")]
    pub host: String,
    /// Redis port (default: 6379). Env: `REDIS_PORT`.
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// Optional password. Env: `REDIS_PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,
    /// Connect over TLS (default: true, managed Redis offerings require it).
    /// Env: `REDIS_SSL`.
    #[serde(default = "default_true")]
    pub ssl: bool,
}

fn default_redis_host() -> String {
    "localhost".into()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_true() -> bool {
    true
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: None,
            ssl: default_true(),
        }
    }
}

impl RedisConfig {
    /// Connection URL for the client: `redis://` or `rediss://` under TLS.
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "rediss" } else { "redis" };
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!("{scheme}://:{password}@{}:{}/", self.host, self.port),
            None => format!("{scheme}://{}:{}/", self.host, self.port),
        }
    }
}

// ── Session store service ────────────────────────────────────────

/// Session store bind address (`[session_service]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionServiceConfig {
    /// Bind host (default: 0.0.0.0)
    #[serde(default = "default_bind_host")]
    pub host: String,
    /// Bind port (default: 8001)
    #[serde(default = "default_session_port")]
    pub port: u16,
}

fn default_bind_host() -> String {
    "0.0.0.0".into()
}

fn default_session_port() -> u16 {
    8001
}

impl Default for SessionServiceConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_session_port(),
        }
    }
}

// ── Completion relay service ─────────────────────────────────────

/// Completion relay settings (`[chat]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Bind host (default: 0.0.0.0)
    #[serde(default = "default_bind_host")]
    pub host: String,
    /// Bind port (default: 8000)
    #[serde(default = "default_chat_port")]
    pub port: u16,
    /// Base URL of the session store service. Env: `SESSION_SERVICE_URL`.
    #[serde(default = "default_session_service_url")]
    pub session_service_url: String,
    /// System prompt injected ahead of every conversation replay.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_chat_port() -> u16 {
    8000
}

fn default_session_service_url() -> String {
    "http://session-service:8001".into()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Keep your responses concise and helpful.".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_chat_port(),
            session_service_url: default_session_service_url(),
            system_prompt: default_system_prompt(),
        }
    }
}

// ── Upstream completions API ─────────────────────────────────────

/// Upstream completions API settings (`[openai]` section).
///
/// `endpoint` and `api_key` have no sensible defaults; the chat service
/// refuses to start without them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base endpoint, e.g. `https://my-resource.openai.azure.com`.
    /// Env: `OPENAI_ENDPOINT`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key. Env: `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Deployment (model) name routed through the endpoint.
    /// Env: `OPENAI_DEPLOYMENT`. Default: `gpt-4o-mini`.
    #[serde(default = "default_openai_deployment")]
    pub deployment: String,
}

fn default_openai_deployment() -> String {
    "gpt-4o-mini".into()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: default_openai_deployment(),
        }
    }
}

// ── Loading & overrides ──────────────────────────────────────────

fn resolve_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CHATRELAY_CONFIG_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    let user_dirs = UserDirs::new().context("could not determine home directory")?;
    Ok(user_dirs.home_dir().join(".chatrelay"))
}

impl Config {
    /// Load `config.toml`, creating it with defaults on first run.
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = resolve_config_dir()?;
        fs::create_dir_all(&config_dir)
            .await
            .with_context(|| format!("failed to create {}", config_dir.display()))?;
        let config_path = config_dir.join("config.toml");

        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            let mut config: Config = toml::from_str(&raw)
                .with_context(|| format!("invalid TOML in {}", config_path.display()))?;
            config.config_path = config_path;
            tracing::info!(path = %config.config_path.display(), initialized = false, "Config loaded");
            Ok(config)
        } else {
            let mut config = Config::default();
            config.config_path = config_path.clone();
            config.save().await?;

            // Restrict permissions on the newly created file (may hold an API key)
            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }

            tracing::info!(path = %config.config_path.display(), initialized = true, "Config loaded");
            Ok(config)
        }
    }

    /// Persist the current config back to its `config.toml`.
    pub async fn save(&self) -> Result<()> {
        let serialized = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&self.config_path, serialized)
            .await
            .with_context(|| format!("failed to write {}", self.config_path.display()))?;
        Ok(())
    }

    /// Apply environment variable overrides. Deployment has always driven
    /// these services through env vars; the TOML file is the local-dev path.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("REDIS_HOST") {
            if !host.trim().is_empty() {
                self.redis.host = host.trim().to_string();
            }
        }
        if let Ok(port) = std::env::var("REDIS_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.redis.port = port,
                Err(_) => tracing::warn!(value = %port, "ignoring unparseable REDIS_PORT"),
            }
        }
        if let Ok(password) = std::env::var("REDIS_PASSWORD") {
            if !password.is_empty() {
                self.redis.password = Some(password);
            }
        }
        if let Ok(ssl) = std::env::var("REDIS_SSL") {
            self.redis.ssl = ssl.trim().eq_ignore_ascii_case("true");
        }

        if let Ok(url) = std::env::var("SESSION_SERVICE_URL") {
            if !url.trim().is_empty() {
                self.chat.session_service_url = url.trim().to_string();
            }
        }

        if let Ok(endpoint) = std::env::var("OPENAI_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.openai.endpoint = Some(endpoint.trim().to_string());
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.openai.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(deployment) = std::env::var("OPENAI_DEPLOYMENT") {
            if !deployment.trim().is_empty() {
                self.openai.deployment = deployment.trim().to_string();
            }
        }
    }

    /// Validate values that would otherwise fail at arbitrary runtime points.
    pub fn validate(&self) -> Result<()> {
        if self.redis.host.trim().is_empty() {
            anyhow::bail!("redis.host must not be empty");
        }
        if self.redis.port == 0 {
            anyhow::bail!("redis.port must not be 0");
        }
        if self.session_service.host.trim().is_empty() {
            anyhow::bail!("session_service.host must not be empty");
        }
        if self.chat.host.trim().is_empty() {
            anyhow::bail!("chat.host must not be empty");
        }
        if self.chat.session_service_url.trim().is_empty() {
            anyhow::bail!("chat.session_service_url must not be empty");
        }
        Ok(())
    }
}
