//! In-process TTL cache

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{CachePort, Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Process-wide map of cached payloads. Never persisted.
#[derive(Debug, Default)]
pub struct MemoryCache<C = SystemClock> {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: C,
}

impl MemoryCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> MemoryCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<C: Clock> CachePort for MemoryCache<C> {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(key) {
                None => {
                    trace!(key, "cache miss");
                    return None;
                }
                Some(entry) if now < entry.expires_at => {
                    trace!(key, "cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock in case another writer refreshed it.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                debug!(key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), CacheEntry { value, expires_at });
        trace!(key, ttl_secs = ttl.as_secs(), "cache entry stored");
    }

    async fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        match pattern {
            Some(pattern) => entries.retain(|key, _| !key.contains(pattern)),
            None => entries.clear(),
        }
        let removed = before - entries.len();
        debug!(pattern = pattern.unwrap_or("*"), removed, "cache invalidated");
        removed
    }
}
