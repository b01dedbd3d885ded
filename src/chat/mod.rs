//! The completion relay service: replays stored history to the completions
//! API and records both new turns back into the session store.

pub mod api;
pub mod client;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use crate::config::Config;
use crate::providers::Provider;
use client::SessionServiceClient;

const MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Clone)]
pub struct ChatState {
    pub sessions: SessionServiceClient,
    pub provider: Arc<dyn Provider>,
    pub system_prompt: String,
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/health", get(api::handle_health))
        .route("/chat", post(api::handle_chat))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run(host: &str, port: u16, config: &Config, provider: Arc<dyn Provider>) -> Result<()> {
    let state = ChatState {
        sessions: SessionServiceClient::new(&config.chat.session_service_url),
        provider,
        system_prompt: config.chat.system_prompt.clone(),
    };
    let app = router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("chat service listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::gateway::shutdown_signal())
        .await?;
    Ok(())
}
