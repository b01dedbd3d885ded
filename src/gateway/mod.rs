//! HTTP surface of the session store service.

pub mod api;

use anyhow::{Context, Result};
use axum::routing::{delete, get};
use axum::Router;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::sessions::SessionStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Shared state injected into every handler. The store clones cheaply
/// (an `Arc` over the backend handle); no ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::handle_health))
        .route("/sessions", get(api::handle_list_sessions))
        .route("/sessions/{session_id}", delete(api::handle_delete_session))
        .route(
            "/sessions/{session_id}/messages",
            get(api::handle_get_messages).post(api::handle_append_message),
        )
        .route("/sessions/{session_id}/info", get(api::handle_session_info))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run(host: &str, port: u16, store: SessionStore) -> Result<()> {
    let backend = store.backend_name().to_string();
    let app = router(AppState { store });
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(backend, "session service listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub(crate) async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
