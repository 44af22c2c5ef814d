//! In-memory TTL cache keyed by operation name and serialized parameters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// `operation:params-json`, so a pattern such as `jobs.` matches a whole operation family.
pub fn cache_key(operation: &str, params: &impl Serialize) -> String {
    let params = serde_json::to_string(params).unwrap_or_default();
    format!("{operation}:{params}")
}

struct Entry {
    value: Value,
    stored_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

pub struct TtlCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    /// Bumped by every invalidation, matching or not, and by `clear`.
    generation: AtomicU64,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`; expired or undecodable entries are dropped and count as misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries();
        let fresh = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                serde_json::from_value(entry.value.clone()).ok()
            }
            _ => None,
        };

        match fresh {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache hit");
                Some(value)
            }
            None => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache miss");
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&self, key: String, value: &T) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        self.entries().insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Current invalidation generation; pair with [`TtlCache::insert_if_current`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Inserts only if nothing was invalidated since `generation` was read, so a value fetched
    /// before a write cannot outlive that write's invalidation.
    pub fn insert_if_current<T: Serialize>(
        &self,
        key: String,
        value: &T,
        generation: u64,
    ) -> bool {
        let Ok(value) = serde_json::to_value(value) else {
            return false;
        };
        let mut entries = self.entries();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(key, "cache insert skipped after invalidation");
            return false;
        }
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
        true
    }

    /// Removes every key containing `pattern`, returning how many were dropped.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = self.entries();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        let removed = before - entries.len();
        if removed > 0 {
            self.invalidations
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(pattern, removed, "cache invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_embed_operation_and_params() {
        let key = cache_key("jobs.list", &json!({ "page": 2 }));
        assert_eq!(key, r#"jobs.list:{"page":2}"#);
    }

    #[tokio::test]
    async fn hits_and_misses_are_counted() {
        let cache = TtlCache::default();
        assert_eq!(cache.get::<u32>("jobs.get:1"), None);
        cache.insert("jobs.get:1".to_string(), &7u32);
        assert_eq!(cache.get::<u32>("jobs.get:1"), Some(7));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(5));
        cache.insert("analytics.dashboard:null".to_string(), &"cached");

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(
            cache.get::<String>("analytics.dashboard:null").as_deref(),
            Some("cached")
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get::<String>("analytics.dashboard:null"), None);
        assert!(cache.is_empty(), "expired entries are dropped on read");
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_stale_entries() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("jobs.get:old".to_string(), &1u8);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert("jobs.get:new".to_string(), &2u8);
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get::<u8>("jobs.get:new"), Some(2));
    }

    #[tokio::test]
    async fn invalidate_matches_substrings() {
        let cache = TtlCache::default();
        cache.insert(cache_key("jobs.list", &json!({})), &1u8);
        cache.insert(cache_key("jobs.get", &"job-000001"), &2u8);
        cache.insert(cache_key("candidates.list", &json!({})), &3u8);

        assert_eq!(cache.invalidate("jobs."), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().invalidations, 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn inserts_racing_an_invalidation_are_dropped() {
        let cache = TtlCache::default();
        let key = cache_key("jobs.list", &json!({}));

        let generation = cache.generation();
        assert_eq!(cache.invalidate("jobs."), 0);
        assert!(!cache.insert_if_current(key.clone(), &1u8, generation));
        assert_eq!(cache.get::<u8>(&key), None);

        let generation = cache.generation();
        assert!(cache.insert_if_current(key.clone(), &2u8, generation));
        assert_eq!(cache.get::<u8>(&key), Some(2));
    }
}
