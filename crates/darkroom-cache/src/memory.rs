//! In-memory TTL store.
//!
//! A `RwLock<HashMap>` with lazy expiry on read plus a periodic sweeper task
//! for entries that are never read again. Suitable for a single-process
//! deployment; a shared backend can implement the same trait.

use crate::{CacheEntry, CacheResult, ResultCache};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
struct StoredEntry {
    entry: CacheEntry,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct InMemoryResultCache {
    inner: Arc<RwLock<HashMap<String, StoredEntry>>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a background task that purges expired entries on an interval.
    /// The task runs until the cache is dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match cache.purge_expired().await {
                    Ok(0) => {}
                    Ok(count) => {
                        tracing::debug!(purged = count, "Result cache sweep");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Result cache sweep failed");
                    }
                }
            }
        })
    }

    /// Number of live (non-expired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let store = self.inner.read().await;
        store.values().filter(|s| s.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, fingerprint: &str) -> CacheResult<Option<CacheEntry>> {
        let expired = {
            let store = self.inner.read().await;
            match store.get(fingerprint) {
                None => return Ok(None),
                Some(stored) if stored.expires_at > Instant::now() => {
                    return Ok(Some(stored.entry.clone()));
                }
                Some(_) => true,
            }
        };

        // Lazy expiry: remove the stale entry on the way out.
        if expired {
            let mut store = self.inner.write().await;
            if let Some(stored) = store.get(fingerprint) {
                if stored.expires_at <= Instant::now() {
                    store.remove(fingerprint);
                }
            }
        }
        Ok(None)
    }

    async fn put(&self, fingerprint: &str, entry: CacheEntry, ttl: Duration) -> CacheResult<()> {
        let mut store = self.inner.write().await;
        store.insert(
            fingerprint.to_string(),
            StoredEntry {
                entry,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, fingerprint: &str) -> CacheResult<()> {
        let mut store = self.inner.write().await;
        store.remove(fingerprint);
        Ok(())
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        let now = Instant::now();
        let mut store = self.inner.write().await;
        let before = store.len();
        store.retain(|_, stored| stored.expires_at > now);
        Ok(before - store.len())
    }
}
