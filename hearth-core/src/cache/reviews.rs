//! Review reads served through the cache

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use super::{cache_key, CachePort, REVIEW_CACHE_PATTERNS};
use crate::config::CacheConfig;
use crate::db::repos::reviews::normalize_window;
use crate::db::ReviewSource;
use crate::error::Result;
use crate::models::{Listing, NewReview, Review, ReviewStats};

/// A [`ReviewSource`] with read-through caching of list and stats.
///
/// Every successful write drops all cached review reads.
pub struct CachedReviews<S> {
    source: S,
    cache: Arc<dyn CachePort>,
    ttl: CacheConfig,
}

impl<S: ReviewSource> CachedReviews<S> {
    pub fn new(source: S, cache: Arc<dyn CachePort>, ttl: CacheConfig) -> Self {
        Self { source, cache, ttl }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn create(&self, input: &NewReview) -> Result<Review> {
        let review = self.source.create(input).await?;
        self.invalidate().await;
        Ok(review)
    }

    pub async fn list(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Review>> {
        let (limit, offset) = normalize_window(limit, offset);
        let key = cache_key("reviews", &json!({ "limit": limit, "offset": offset }))?;

        self.read_through(&key, self.ttl.list_ttl, || self.source.list(limit, offset))
            .await
    }

    /// Like [`list`](Self::list), but a database outage yields an empty listing.
    pub async fn list_or_empty(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Listing<Review>> {
        match self.list(limit, offset).await {
            Ok(items) => Ok(Listing::new(items)),
            Err(err) if err.is_transient() => {
                error!(error = %err, "review listing unavailable");
                Ok(Listing::degraded("Reviews are temporarily unavailable"))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn stats(&self) -> Result<ReviewStats> {
        let key = cache_key("stats", &json!({}))?;
        self.read_through(&key, self.ttl.stats_ttl, || self.source.stats())
            .await
    }

    pub async fn update_status(&self, id: Uuid, verified: bool) -> Result<Review> {
        let review = self.source.update_status(id, verified).await?;
        self.invalidate().await;
        Ok(review)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.source.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    async fn read_through<T, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get(key).await {
            debug!(key, "review cache hit");
            return Ok(serde_json::from_value(hit)?);
        }

        let value = load().await?;
        self.cache.set(key, serde_json::to_value(&value)?, ttl).await;
        Ok(value)
    }

    async fn invalidate(&self) {
        for pattern in REVIEW_CACHE_PATTERNS {
            self.cache.invalidate(Some(pattern)).await;
        }
    }
}
