//! Redis-backed session backend.
//!
//! Holds a [`ConnectionManager`], which multiplexes one connection and
//! reconnects on failure, so the backend can be cloned cheaply into every
//! request handler. Each trait method is a single Redis command; TTLs are
//! enforced server-side, which is what makes session expiry passive (no
//! sweep task in this process).

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::traits::SessionBackend;
use crate::config::RedisConfig;

pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Connect and verify liveness. Startup fails fast when Redis is
    /// unreachable rather than limping along with a dead handle.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url()).with_context(|| {
            format!(
                "invalid Redis connection parameters for {}:{}",
                config.host, config.port
            )
        })?;
        let manager = client.get_connection_manager().await.with_context(|| {
            format!("failed to connect to Redis at {}:{}", config.host, config.port)
        })?;
        let backend = Self { manager };
        backend.ping().await.context("Redis liveness check failed")?;
        Ok(backend)
    }
}

#[async_trait]
impl SessionBackend for RedisBackend {
    async fn ping(&self) -> Result<()> {
        let mut con = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }

    async fn push_front(&self, key: &str, value: &str) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.lpush(key, value).await?;
        Ok(())
    }

    async fn trim_front(&self, key: &str, max_len: usize) -> Result<()> {
        let mut con = self.manager.clone();
        let stop = max_len as isize - 1;
        let _: () = con.ltrim(key, 0, stop).await?;
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>> {
        let mut con = self.manager.clone();
        let entries: Vec<String> = con.lrange(key, 0, -1).await?;
        Ok(entries)
    }

    async fn list_len(&self, key: &str) -> Result<u64> {
        let mut con = self.manager.clone();
        let len: u64 = con.llen(key).await?;
        Ok(len)
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.manager.clone();
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut con = self.manager.clone();
        let removed: u64 = con.del(keys.to_vec()).await?;
        Ok(removed)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut con = self.manager.clone();
        let keys: Vec<String> = con.keys(pattern).await?;
        Ok(keys)
    }

    fn name(&self) -> &str {
        "redis"
    }
}
