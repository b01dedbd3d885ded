//! Session management — bounded, expiring per-conversation message logs.

pub mod in_memory;
pub mod redis;
pub mod store;
pub mod traits;

pub use in_memory::InMemoryBackend;
pub use redis::RedisBackend;
pub use store::{Message, SessionInfo, SessionStore};
pub use traits::SessionBackend;

use crate::config::RedisConfig;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Retention bound: a session keeps at most this many messages, oldest
/// evicted first. Enforced after every append, never checked on read.
pub const MAX_MESSAGES_PER_SESSION: usize = 20;

/// Sliding expiry window shared by all three keys of a session. Every
/// qualifying read or write restarts it.
pub const SESSION_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Create the production session store over a Redis backend.
pub async fn create_session_store(config: &RedisConfig) -> Result<SessionStore> {
    let backend = RedisBackend::connect(config).await?;
    Ok(SessionStore::new(Arc::new(backend)))
}
