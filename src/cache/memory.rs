use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{CacheError, CacheKey, QueryCache};

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Expired entries of keys nobody reads again are dropped at least this often.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-process cache backend bounded to `max_entries` keys.
///
/// Expired entries are dropped on read and swept on write; when a write
/// would exceed the bound, the entry closest to expiry is evicted.
pub struct MemoryQueryCache {
    entries: DashMap<String, Entry>,
    max_entries: usize,
    last_sweep: Mutex<Instant>,
}

impl Default for MemoryQueryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryQueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);
        *self.last_sweep.lock() = now;
    }

    fn evict_soonest(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.expires_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    fn make_room(&self, key: &str, now: Instant) {
        let sweep_due = now.duration_since(*self.last_sweep.lock()) >= SWEEP_INTERVAL;
        let is_new = !self.entries.contains_key(key);

        if sweep_due || (is_new && self.entries.len() >= self.max_entries) {
            self.sweep(now);
        }

        while is_new && self.entries.len() >= self.max_entries {
            self.evict_soonest();
        }
    }
}

#[async_trait::async_trait]
impl QueryCache for MemoryQueryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key.as_str()) {
            if entry.expires_at > now {
                return Ok(Some(entry.payload.clone()));
            }
        }

        self.entries
            .remove_if(key.as_str(), |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| anyhow::anyhow!("Cache TTL of {}s is out of range", ttl.as_secs()))?;

        self.make_room(key.as_str(), now);
        self.entries.insert(
            key.as_str().to_string(),
            Entry {
                payload: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::search::{FarmerSearchQuery, PageRequest};

    fn page_key(page: u64) -> CacheKey {
        CacheKey::farmers(&FarmerSearchQuery {
            page: PageRequest { page, limit: 20 },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemoryQueryCache::new();
        let key = CacheKey::farmers(&FarmerSearchQuery::default());

        cache
            .set(&key, "{}".to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("{}"));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cache = MemoryQueryCache::new();
        let key = CacheKey::farmers(&FarmerSearchQuery::default());

        cache.set(&key, "a".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.set(&key, "b".to_string(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("b"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_never_exceed_capacity() {
        let cache = MemoryQueryCache::with_capacity(100);

        for page in 1..=1000 {
            cache
                .set(&page_key(page), "{}".to_string(), Duration::from_millis(1))
                .await
                .unwrap();
        }
        assert!(cache.len() <= 100);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .set(&page_key(1001), "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        for page in 1002..=1100 {
            cache
                .set(&page_key(page), "{}".to_string(), Duration::from_secs(60))
                .await
                .unwrap();
        }

        assert_eq!(cache.len(), 100);
        assert_eq!(cache.get(&page_key(1100)).await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn full_cache_evicts_the_entry_closest_to_expiry() {
        let cache = MemoryQueryCache::with_capacity(2);

        cache.set(&page_key(1), "short".to_string(), Duration::from_secs(10)).await.unwrap();
        cache.set(&page_key(2), "long".to_string(), Duration::from_secs(600)).await.unwrap();
        cache.set(&page_key(3), "new".to_string(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&page_key(1)).await.unwrap(), None);
        assert_eq!(cache.get(&page_key(2)).await.unwrap().as_deref(), Some("long"));
    }

    #[tokio::test]
    async fn unrepresentable_ttl_is_an_error() {
        let cache = MemoryQueryCache::new();
        let result = cache
            .set(&page_key(1), "{}".to_string(), Duration::MAX)
            .await;

        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
