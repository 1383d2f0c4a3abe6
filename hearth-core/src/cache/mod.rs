//! Read-through caching for review reads
//!
//! - [`CachePort`]: injectable cache interface (async so a shared cache can
//!   stand in for the in-process one)
//! - [`MemoryCache`]: process-local TTL map with pattern invalidation
//! - [`CachedReviews`]: review repository wrapped in the cache

pub mod memory;
pub mod reviews;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

pub use memory::MemoryCache;
pub use reviews::CachedReviews;

/// Key substrings dropped after any review write
pub const REVIEW_CACHE_PATTERNS: [&str; 2] = ["reviews", "stats"];

/// Cache interface used by the repositories
#[async_trait]
pub trait CachePort: Send + Sync {
    /// Fresh value for `key`, if any. Stale entries are evicted and reported as misses.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store `value` until `ttl` from now.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);

    /// Remove every key containing `pattern`; `None` clears everything.
    /// Returns the number of entries removed.
    async fn invalidate(&self, pattern: Option<&str>) -> usize;
}

/// Time source for expiry decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// Stable key for `(operation, params)`: `"<operation>:<md5 of canonical JSON>"`.
///
/// Object keys serialize in sorted order, so equal parameter sets always
/// hash the same regardless of construction order.
pub fn cache_key<P: Serialize + ?Sized>(
    operation: &str,
    params: &P,
) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_value(params)?.to_string();
    Ok(format!("{}:{:x}", operation, md5::compute(canonical.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_stable_and_prefixed() {
        let a = cache_key("reviews", &json!({"limit": 10, "offset": 0})).unwrap();
        let b = cache_key("reviews", &json!({"offset": 0, "limit": 10})).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("reviews:"));
        assert_eq!(a.len(), "reviews:".len() + 32);

        let c = cache_key("reviews", &json!({"limit": 10, "offset": 10})).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn manual_clock_advances_all_clones() {
        let clock = ManualClock::new();
        let shared = clock.clone();
        let before = clock.now();
        shared.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - before, Duration::from_secs(90));
    }
}
