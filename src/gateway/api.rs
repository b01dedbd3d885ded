//! REST handlers for the session store.
//!
//! Paths and response shapes are the external contract; clients depend on
//! them verbatim. Store failures are converted at this boundary into a
//! generic 500 JSON body — the store itself never retries.

use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::sessions::Message;

fn internal_error(context: &str, err: &anyhow::Error) -> Response {
    tracing::error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": format!("{context}: {err}")})),
    )
        .into_response()
}

/// GET /health — liveness of the service and its backend.
///
/// Degraded backends are reported in-band (`status: "unhealthy"` with the
/// error text) rather than by failing the request.
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "service": "session-service",
            "redis": "connected",
        })),
        Err(err) => Json(serde_json::json!({
            "status": "unhealthy",
            "service": "session-service",
            "redis": format!("error: {err}"),
        })),
    }
}

/// GET /sessions/{session_id}/messages — full history, oldest first.
pub async fn handle_get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.messages(&session_id).await {
        Ok(messages) => {
            let total_messages = messages.len();
            Json(serde_json::json!({
                "messages": messages,
                "session_id": session_id,
                "total_messages": total_messages,
            }))
            .into_response()
        }
        Err(err) => internal_error("failed to get session messages", &err),
    }
}

/// POST /sessions/{session_id}/messages — append one turn.
pub async fn handle_append_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(message): Json<Message>,
) -> Response {
    match state.store.append_message(&session_id, message).await {
        Ok(()) => Json(serde_json::json!({
            "status": "success",
            "message": "Message added to session",
            "session_id": session_id,
        }))
        .into_response(),
        Err(err) => internal_error("failed to add message to session", &err),
    }
}

/// GET /sessions/{session_id}/info — live count and last activity.
pub async fn handle_session_info(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.info(&session_id).await {
        Ok(info) => Json(info).into_response(),
        Err(err) => internal_error("failed to get session info", &err),
    }
}

/// DELETE /sessions/{session_id} — drop all session keys. Idempotent.
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.delete(&session_id).await {
        Ok(deleted_keys) => Json(serde_json::json!({
            "status": "success",
            "message": "Session deleted",
            "session_id": session_id,
            "deleted_keys": deleted_keys,
        }))
        .into_response(),
        Err(err) => internal_error("failed to delete session", &err),
    }
}

/// GET /sessions — enumerate sessions with a live activity marker.
pub async fn handle_list_sessions(State(state): State<AppState>) -> Response {
    match state.store.list_active().await {
        Ok(sessions) => Json(serde_json::json!({
            "total": sessions.len(),
            "sessions": sessions,
        }))
        .into_response(),
        Err(err) => internal_error("failed to list sessions", &err),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{router, AppState};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::sessions::{InMemoryBackend, SessionStore};

    fn app() -> Router {
        let store = SessionStore::new(Arc::new(InMemoryBackend::new()));
        router(AppState { store })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_backend_connected() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "session-service");
        assert_eq!(body["redis"], "connected");
    }

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let app = app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/sessions/s1/messages",
            Some(json!({"role": "user", "content": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["session_id"], "s1");

        send(
            &app,
            Method::POST,
            "/sessions/s1/messages",
            Some(json!({"role": "assistant", "content": "hello"})),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/sessions/s1/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["total_messages"], 2);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hi");
        assert_eq!(messages[1]["role"], "assistant");
        assert!(messages[1]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn explicit_timestamp_is_preserved_on_the_wire() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/sessions/s1/messages",
            Some(json!({
                "role": "user",
                "content": "hi",
                "timestamp": "2024-01-02T03:04:05.000000+00:00"
            })),
        )
        .await;

        let (_, body) = send(&app, Method::GET, "/sessions/s1/messages", None).await;
        assert_eq!(
            body["messages"][0]["timestamp"],
            "2024-01-02T03:04:05.000000+00:00"
        );
    }

    #[tokio::test]
    async fn unknown_session_reads_as_empty_not_error() {
        let app = app();

        // Info before any read: no activity recorded yet.
        let (status, body) = send(&app, Method::GET, "/sessions/ghost/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message_count"], 0);
        assert!(body["last_activity"].is_null());

        let (status, body) = send(&app, Method::GET, "/sessions/ghost/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_messages"], 0);
        assert!(body["messages"].as_array().unwrap().is_empty());

        // The read itself refreshes the activity marker.
        let (status, body) = send(&app, Method::GET, "/sessions/ghost/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message_count"], 0);
        assert!(body["last_activity"].is_string());
    }

    #[tokio::test]
    async fn info_reports_live_count_and_activity() {
        let app = app();
        for content in ["a", "b", "c"] {
            send(
                &app,
                Method::POST,
                "/sessions/s1/messages",
                Some(json!({"role": "user", "content": content})),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/sessions/s1/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["message_count"], 3);
        assert!(body["last_activity"].is_string());
    }

    #[tokio::test]
    async fn delete_reports_removed_keys_and_is_idempotent() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/sessions/s1/messages",
            Some(json!({"role": "user", "content": "hi"})),
        )
        .await;

        let (status, body) = send(&app, Method::DELETE, "/sessions/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["deleted_keys"], 3);

        let (status, body) = send(&app, Method::DELETE, "/sessions/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted_keys"], 0);
    }

    #[tokio::test]
    async fn list_sessions_counts_active_conversations() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/sessions/alpha/messages",
            Some(json!({"role": "user", "content": "a"})),
        )
        .await;
        send(
            &app,
            Method::POST,
            "/sessions/beta/messages",
            Some(json!({"role": "user", "content": "b"})),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        let sessions = body["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s["message_count"] == 1));
    }

    #[tokio::test]
    async fn retention_bound_is_visible_over_http() {
        let app = app();
        for n in 0..25 {
            send(
                &app,
                Method::POST,
                "/sessions/s1/messages",
                Some(json!({"role": "user", "content": format!("m{n}")})),
            )
            .await;
        }

        let (_, body) = send(&app, Method::GET, "/sessions/s1/messages", None).await;
        assert_eq!(body["total_messages"], 20);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["content"], "m5");
        assert_eq!(messages[19]["content"], "m24");
    }
}
