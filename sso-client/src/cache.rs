//! Short-lived cache of verified authentications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::model::Authentication;

/// Key-value store for verified authentications, keyed by the raw token.
///
/// An entry whose expiry has passed must read as absent, whether or not it has
/// been physically removed. Failures inside an implementation should surface
/// as misses; the client falls back to verifying the token again.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Look up the authentication cached for `key`.
    async fn get(&self, key: &str) -> Option<Authentication>;

    /// Store `authc` under `key` until `expires_at`. Last write wins.
    async fn put(&self, key: &str, authc: Authentication, expires_at: DateTime<Utc>);

    /// Remove `key`. Removing an absent key is a no-op.
    async fn remove(&self, key: &str);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    authc: Authentication,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process [`CacheProvider`] backed by a concurrent hash map.
///
/// Expired entries are dropped lazily on lookup. Long-running services can
/// also sweep them with [`InMemoryCacheProvider::spawn_cleanup_task`].
#[derive(Debug, Default)]
pub struct InMemoryCacheProvider {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheProvider {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Spawn a background task that purges expired entries every `every`.
    ///
    /// Returns a `JoinHandle` that can be used to abort the task.
    pub fn spawn_cleanup_task(cache: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let evicted = cache.purge_expired();
                if evicted > 0 {
                    info!(
                        evicted,
                        remaining = cache.len(),
                        "Authentication cache cleanup completed"
                    );
                } else {
                    debug!(
                        entries = cache.len(),
                        "Authentication cache cleanup: nothing expired"
                    );
                }
            }
        })
    }
}

#[async_trait]
impl CacheProvider for InMemoryCacheProvider {
    async fn get(&self, key: &str) -> Option<Authentication> {
        let now = Utc::now();
        // remove_if takes the shard lock, so a concurrent put is not lost
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            return None;
        }
        self.entries.get(key).map(|entry| entry.authc.clone())
    }

    async fn put(&self, key: &str, authc: Authentication, expires_at: DateTime<Utc>) {
        let entry = CacheEntry { authc, expires_at };
        self.entries.insert(key.to_string(), entry);
    }

    async fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
