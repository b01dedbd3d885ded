//! The session history protocol: bounded, expiring per-session message logs.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::traits::SessionBackend;
use super::{MAX_MESSAGES_PER_SESSION, SESSION_EXPIRY};

/// A single conversation turn. `role` is a free string by contract
/// ("system" | "user" | "assistant" by convention); the store validates
/// nothing about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    /// ISO-8601. Server-assigned at append time when absent on input.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Point-in-time view of a session: live message count plus the last
/// recorded activity timestamp (absent when the session has never been
/// touched through the activity-tracking path, or has expired).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub message_count: u64,
    pub last_activity: Option<String>,
}

/// Bounded, expiring per-session message log over a [`SessionBackend`].
///
/// State per session lives under three keys sharing one sliding expiry
/// window: `session:{id}:messages` (JSON entries, newest first, capped at
/// [`MAX_MESSAGES_PER_SESSION`]), `session:{id}:last_activity` and
/// `session:{id}:count`. A session is created implicitly by its first
/// append and destroyed by explicit delete or by the backend expiring all
/// three keys.
///
/// The multi-step append sequence is deliberately not atomic: concurrent
/// appends to the same session may interleave (last-write-wins on
/// `last_activity`/`count`). Sessions are single-writer in practice.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.backend.ping().await
    }

    fn messages_key(session_id: &str) -> String {
        format!("session:{session_id}:messages")
    }

    fn last_activity_key(session_id: &str) -> String {
        format!("session:{session_id}:last_activity")
    }

    fn count_key(session_id: &str) -> String {
        format!("session:{session_id}:count")
    }

    /// Record activity on a session, restarting its expiry window.
    async fn touch(&self, session_id: &str) -> Result<()> {
        self.backend
            .set_with_expiry(
                &Self::last_activity_key(session_id),
                &now_timestamp(),
                SESSION_EXPIRY,
            )
            .await
    }

    /// Append a message to the session log, assigning a timestamp when the
    /// caller did not supply one, then trim to the retention bound, refresh
    /// the expiry window and recompute the cached count.
    pub async fn append_message(&self, session_id: &str, mut message: Message) -> Result<()> {
        if message.timestamp.is_none() {
            message.timestamp = Some(now_timestamp());
        }
        let record = serde_json::to_string(&message)?;
        let messages_key = Self::messages_key(session_id);

        self.backend.push_front(&messages_key, &record).await?;
        self.backend
            .trim_front(&messages_key, MAX_MESSAGES_PER_SESSION)
            .await?;
        self.backend.expire(&messages_key, SESSION_EXPIRY).await?;
        self.touch(session_id).await?;

        let count = self.backend.list_len(&messages_key).await?;
        self.backend
            .set_with_expiry(
                &Self::count_key(session_id),
                &count.to_string(),
                SESSION_EXPIRY,
            )
            .await?;
        Ok(())
    }

    /// The session's messages in chronological (oldest-first) order.
    ///
    /// Storage order is newest-first; this reverses before returning so
    /// callers can replay history directly. Entries that fail to decode are
    /// skipped and logged, never fatal. Reading counts as activity and
    /// restarts the expiry window. An absent session reads as empty.
    pub async fn messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let raw = self
            .backend
            .list_range(&Self::messages_key(session_id))
            .await?;

        let mut messages: Vec<Message> = Vec::with_capacity(raw.len());
        for entry in &raw {
            match serde_json::from_str::<Message>(entry) {
                Ok(message) => messages.push(message),
                Err(err) => {
                    warn!(session_id, error = %err, "skipping undecodable message record");
                }
            }
        }
        messages.reverse();

        self.touch(session_id).await?;
        Ok(messages)
    }

    /// Live message count (queried, not the cached `count` key) and last
    /// activity. Does not refresh the expiry window.
    pub async fn info(&self, session_id: &str) -> Result<SessionInfo> {
        let message_count = self
            .backend
            .list_len(&Self::messages_key(session_id))
            .await?;
        let last_activity = self
            .backend
            .get_string(&Self::last_activity_key(session_id))
            .await?;
        Ok(SessionInfo {
            session_id: session_id.to_string(),
            message_count,
            last_activity,
        })
    }

    /// Remove all three session keys in one backend request. Returns how
    /// many actually existed (0 for an absent session). Idempotent.
    pub async fn delete(&self, session_id: &str) -> Result<u64> {
        let keys = vec![
            Self::messages_key(session_id),
            Self::last_activity_key(session_id),
            Self::count_key(session_id),
        ];
        self.backend.delete(&keys).await
    }

    /// Enumerate sessions with a live `last_activity` key. One extra count
    /// lookup per session, so linear in active sessions; administrative use
    /// only.
    pub async fn list_active(&self) -> Result<Vec<SessionInfo>> {
        let keys = self.backend.scan_keys("session:*:last_activity").await?;

        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(session_id) = key
                .strip_prefix("session:")
                .and_then(|rest| rest.strip_suffix(":last_activity"))
            else {
                continue;
            };
            let message_count = self
                .backend
                .list_len(&Self::messages_key(session_id))
                .await?;
            let last_activity = self.backend.get_string(&key).await?;
            sessions.push(SessionInfo {
                session_id: session_id.to_string(),
                message_count,
                last_activity,
            });
        }
        Ok(sessions)
    }
}
