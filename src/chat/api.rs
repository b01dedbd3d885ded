//! The chat turn handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use super::ChatState;
use crate::providers::{ChatMessage, ProviderError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

fn internal_error(context: &str, err: &anyhow::Error) -> Response {
    tracing::error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": format!("{context}: {err}")})),
    )
        .into_response()
}

/// GET /health
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "chat-service",
    }))
}

/// POST /chat — one synchronous conversation turn.
///
/// Replays the stored history (system prompt first, then the transcript in
/// chronological order, then the new user message), calls the completions
/// API, and records the user and assistant turns back into the session
/// store. A model-call timeout surfaces as 504; other failures as 500.
pub async fn handle_chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let history = match state.sessions.history(&request.session_id).await {
        Ok(history) => history,
        Err(err) => return internal_error("failed to fetch conversation history", &err),
    };

    let messages = build_completion_messages(&state.system_prompt, &history, &request.message);

    let reply = match state.provider.chat(&messages).await {
        Ok(reply) => reply,
        Err(ProviderError::Timeout) => {
            tracing::error!(session_id = %request.session_id, "completion request timed out");
            return (
                StatusCode::GATEWAY_TIMEOUT,
                Json(serde_json::json!({"error": "request timeout"})),
            )
                .into_response();
        }
        Err(err) => {
            tracing::error!(error = %err, session_id = %request.session_id, "completion call failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": format!("failed to get completion: {err}")})),
            )
                .into_response();
        }
    };

    if let Err(err) = state
        .sessions
        .append(&request.session_id, "user", &request.message)
        .await
    {
        return internal_error("failed to record user message", &err);
    }
    if let Err(err) = state
        .sessions
        .append(&request.session_id, "assistant", &reply)
        .await
    {
        return internal_error("failed to record assistant message", &err);
    }

    Json(ChatResponse {
        response: reply,
        session_id: request.session_id,
    })
    .into_response()
}

/// System prompt first, stored history in order, the new user turn last.
fn build_completion_messages(
    system_prompt: &str,
    history: &[ChatMessage],
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new("system", system_prompt));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::new("user", user_message));
    messages
}
