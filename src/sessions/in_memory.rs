//! In-memory session backend implementation.
//!
//! Mirrors the list/KV semantics of the Redis backend closely enough to run
//! the full session protocol in tests and local development: per-key
//! expiry deadlines are tracked alongside the data and purged lazily on
//! access, the way a backend-driven TTL looks to callers.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::traits::SessionBackend;

#[derive(Default)]
struct State {
    lists: HashMap<String, VecDeque<String>>,
    strings: HashMap<String, String>,
    deadlines: HashMap<String, Instant>,
}

impl State {
    fn purge(&mut self, key: &str) {
        if let Some(deadline) = self.deadlines.get(key) {
            if *deadline <= Instant::now() {
                self.deadlines.remove(key);
                self.lists.remove(key);
                self.strings.remove(key);
            }
        }
    }

    fn purge_all(&mut self) {
        let expired: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= Instant::now())
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.deadlines.remove(&key);
            self.lists.remove(&key);
            self.strings.remove(&key);
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.lists.contains_key(key) || self.strings.contains_key(key)
    }
}

/// An in-memory backend guarded by a single mutex.
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Match `input` against a pattern where `*` matches any run of characters.
fn glob_match(pattern: &str, input: &str) -> bool {
    let mut fragments = pattern.split('*');
    let first = fragments.next().unwrap_or("");
    let Some(mut rest) = input.strip_prefix(first) else {
        return false;
    };
    let fragments: Vec<&str> = fragments.collect();
    if fragments.is_empty() {
        // No wildcard at all: the prefix must consume the whole input.
        return rest.is_empty();
    }
    for (i, fragment) in fragments.iter().enumerate() {
        let last = i == fragments.len() - 1;
        if fragment.is_empty() {
            if last {
                return true;
            }
            continue;
        }
        if last {
            return rest.ends_with(fragment);
        }
        match rest.find(fragment) {
            Some(pos) => rest = &rest[pos + fragment.len()..],
            None => return false,
        }
    }
    true
}

#[async_trait]
impl SessionBackend for InMemoryBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn push_front(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.purge(key);
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn trim_front(&self, key: &str, max_len: usize) -> Result<()> {
        let mut state = self.state.lock();
        state.purge(key);
        if let Some(list) = state.lists.get_mut(key) {
            list.truncate(max_len);
        }
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.purge(key);
        Ok(state
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_len(&self, key: &str) -> Result<u64> {
        let mut state = self.state.lock();
        state.purge(key);
        Ok(state.lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.lock();
        state.purge(key);
        Ok(state.strings.get(key).cloned())
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.strings.insert(key.to_string(), value.to_string());
        state.deadlines.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.purge(key);
        if state.exists(key) {
            state.deadlines.insert(key.to_string(), Instant::now() + ttl);
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut state = self.state.lock();
        let mut removed = 0;
        for key in keys {
            state.purge(key);
            let had_list = state.lists.remove(key).is_some();
            let had_string = state.strings.remove(key).is_some();
            state.deadlines.remove(key);
            if had_list || had_string {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.purge_all();
        let mut keys: Vec<String> = state
            .lists
            .keys()
            .chain(state.strings.keys())
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_and_range_are_head_first() {
        let backend = InMemoryBackend::new();
        backend.push_front("k", "a").await.unwrap();
        backend.push_front("k", "b").await.unwrap();

        let entries = backend.list_range("k").await.unwrap();
        assert_eq!(entries, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(backend.list_len("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn trim_discards_the_tail() {
        let backend = InMemoryBackend::new();
        for i in 0..5 {
            backend.push_front("k", &i.to_string()).await.unwrap();
        }
        backend.trim_front("k", 3).await.unwrap();

        let entries = backend.list_range("k").await.unwrap();
        assert_eq!(entries, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn absent_list_reads_as_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.list_range("nope").await.unwrap().is_empty());
        assert_eq!(backend.list_len("nope").await.unwrap(), 0);
        assert_eq!(backend.get_string("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_with_zero_ttl_expires_immediately() {
        let backend = InMemoryBackend::new();
        backend
            .set_with_expiry("k", "v", Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(backend.get_string("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expire_with_zero_ttl_drops_a_list() {
        let backend = InMemoryBackend::new();
        backend.push_front("k", "a").await.unwrap();
        backend.expire("k", Duration::ZERO).await.unwrap();
        assert!(backend.list_range("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expire_on_missing_key_is_a_no_op() {
        let backend = InMemoryBackend::new();
        backend.expire("ghost", Duration::from_secs(60)).await.unwrap();
        assert!(backend.scan_keys("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_counts_only_existing_keys() {
        let backend = InMemoryBackend::new();
        backend.push_front("a", "1").await.unwrap();
        backend
            .set_with_expiry("b", "x", Duration::from_secs(60))
            .await
            .unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(backend.delete(&keys).await.unwrap(), 2);
        assert_eq!(backend.delete(&keys).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scan_keys_skips_expired_entries() {
        let backend = InMemoryBackend::new();
        backend
            .set_with_expiry("session:a:last_activity", "t", Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .set_with_expiry("session:b:last_activity", "t", Duration::ZERO)
            .await
            .unwrap();

        let keys = backend.scan_keys("session:*:last_activity").await.unwrap();
        assert_eq!(keys, vec!["session:a:last_activity".to_string()]);
    }

    #[test]
    fn glob_matches_middle_wildcard() {
        assert!(glob_match("session:*:last_activity", "session:s1:last_activity"));
        assert!(glob_match(
            "session:*:last_activity",
            "session:a:b:last_activity"
        ));
        assert!(!glob_match("session:*:last_activity", "session:s1:count"));
        assert!(!glob_match("session:*:last_activity", "other:s1:last_activity"));
    }

    #[test]
    fn glob_without_wildcard_is_exact() {
        assert!(glob_match("abc", "abc"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[test]
    fn glob_trailing_wildcard_matches_any_suffix() {
        assert!(glob_match("session:*", "session:"));
        assert!(glob_match("session:*", "session:x:count"));
        assert!(!glob_match("session:*", "sessio"));
    }
}
