#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use chatrelay::config::Config;
use chatrelay::{chat, gateway, providers, sessions};

/// `chatrelay` - bounded session history + completion relay.
#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "Two-service chat backend: session store + completion relay.", long_about = None)]
struct Cli {
    /// Directory containing config.toml (defaults to ~/.chatrelay)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the session store service
    #[command(long_about = "\
Start the session store service.

Serves the bounded, expiring per-session message log over HTTP, backed \
by Redis. Bind address defaults to the values in your config file \
(session_service.host / session_service.port).

Examples:
  chatrelay session                 # use config defaults
  chatrelay session -p 8001         # listen on port 8001
  chatrelay session --host 0.0.0.0  # bind to all interfaces")]
    Session {
        /// Port to listen on; defaults to config session_service.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config session_service.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Start the completion relay service
    #[command(long_about = "\
Start the completion relay service.

Accepts chat turns, replays stored history to the completions API and \
records both new turns in the session store. Requires openai.endpoint \
and openai.api_key (or OPENAI_ENDPOINT / OPENAI_API_KEY).

Examples:
  chatrelay chat                    # use config defaults
  chatrelay chat -p 8000")]
    Chat {
        /// Port to listen on; defaults to config chat.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config chat.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Show resolved configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS before any client or
    // Redis connection is built.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("CHATRELAY_CONFIG_DIR", config_dir);
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();
    config.validate()?;

    match cli.command {
        Commands::Session { port, host } => {
            let port = port.unwrap_or(config.session_service.port);
            let host = host.unwrap_or_else(|| config.session_service.host.clone());
            info!("🚀 Starting session service on {host}:{port}");
            let store = sessions::create_session_store(&config.redis).await?;
            gateway::run(&host, port, store).await
        }

        Commands::Chat { port, host } => {
            let port = port.unwrap_or(config.chat.port);
            let host = host.unwrap_or_else(|| config.chat.host.clone());
            let provider: Arc<dyn providers::Provider> =
                Arc::from(providers::create_provider(&config.openai)?);
            info!("🚀 Starting chat service on {host}:{port}");
            chat::run(&host, port, &config, provider).await
        }

        Commands::Status => {
            println!("🦀 chatrelay Status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!();
            println!(
                "🗄️  Redis:            {}:{} (tls: {})",
                config.redis.host,
                config.redis.port,
                if config.redis.ssl { "on" } else { "off" }
            );
            println!(
                "📨 Session service:  {}:{} (cap {} messages, expiry {}h)",
                config.session_service.host,
                config.session_service.port,
                sessions::MAX_MESSAGES_PER_SESSION,
                sessions::SESSION_EXPIRY.as_secs() / 3600,
            );
            println!(
                "💬 Chat service:     {}:{} → {}",
                config.chat.host, config.chat.port, config.chat.session_service_url
            );
            println!(
                "🤖 Completions:      {} (deployment: {})",
                config
                    .openai
                    .endpoint
                    .as_deref()
                    .unwrap_or("(endpoint not set)"),
                config.openai.deployment
            );
            Ok(())
        }
    }
}
