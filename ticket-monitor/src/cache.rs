//! Caching layer for left-ticket responses.
//!
//! Responses are cached per (date, origin, destination) so that one poll
//! cycle touching the same route twice (e.g. a full-route fallback query)
//! does not hit the network twice. Entries expire after a TTL, checked
//! lazily on read and swept on a fixed interval; at capacity the
//! oldest-inserted entry is evicted first (insertion order, not LRU). The
//! monitor additionally clears the cache after every poll cycle so each
//! cycle observes fresh data.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::Telecode;
use crate::railway::{RailwayError, TicketClient, TicketQueryResult};

/// Cache key: (travel date, origin telecode, destination telecode).
pub type TicketKey = (NaiveDate, Telecode, Telecode);

/// Configuration for the ticket cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: usize,

    /// How often the background sweep removes expired entries.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_capacity: 1000,
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl CacheConfig {
    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum entry count.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// One cached payload with its expiry.
struct CacheEntry {
    payload: Arc<TicketQueryResult>,
    expires_at: Instant,
}

/// Counts reported by [`TicketCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub max_capacity: usize,
}

/// Insertion-ordered, TTL-expiring, capacity-bounded response cache.
pub struct TicketCache {
    entries: Mutex<IndexMap<TicketKey, CacheEntry>>,
    config: CacheConfig,
}

impl TicketCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            config,
        }
    }

    /// Get a non-expired entry. Expired entries are removed on read.
    pub async fn get(&self, key: &TicketKey) -> Option<Arc<TicketQueryResult>> {
        let mut entries = self.entries.lock().await;

        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            entries.shift_remove(key);
            return None;
        }

        Some(entry.payload.clone())
    }

    /// Insert an entry, evicting the oldest-inserted entry when full.
    pub async fn insert(&self, key: TicketKey, payload: Arc<TicketQueryResult>) {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(&key) && entries.len() >= self.config.max_capacity {
            entries.shift_remove_index(0);
        }

        entries.insert(
            key,
            CacheEntry {
                payload,
                expires_at: Instant::now() + self.config.ttl,
            },
        );
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        entries.clear();
        if removed > 0 {
            info!(removed, "ticket cache cleared");
        }
    }

    /// Remove all expired entries; returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let removed = before - entries.len();

        if removed > 0 {
            info!(removed, remaining = entries.len(), "swept expired cache entries");
        }
        removed
    }

    /// Current entry count, including not-yet-swept expired entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Counts of valid and expired entries (for logging).
    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock().await;

        let expired = entries
            .values()
            .filter(|entry| now >= entry.expires_at)
            .count();

        CacheStats {
            total: entries.len(),
            valid: entries.len() - expired,
            expired,
            max_capacity: self.config.max_capacity,
        }
    }
}

/// Left-ticket client with response caching.
///
/// Wraps a [`TicketClient`] and serves repeat queries from the cache.
pub struct CachedTicketClient {
    client: TicketClient,
    cache: TicketCache,
}

impl CachedTicketClient {
    /// Create a new cached client.
    pub fn new(client: TicketClient, cache_config: CacheConfig) -> Self {
        Self {
            client,
            cache: TicketCache::new(cache_config),
        }
    }

    /// Fetch availability, using the cache when possible.
    ///
    /// `delay_before_fetch` is awaited only when the query misses the
    /// cache, to respect upstream rate expectations; cache hits return
    /// immediately.
    pub async fn fetch_availability(
        &self,
        date: NaiveDate,
        from: Telecode,
        to: Telecode,
        delay_before_fetch: Option<Duration>,
    ) -> Result<Arc<TicketQueryResult>, RailwayError> {
        let key = (date, from, to);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(%date, %from, %to, "served from ticket cache");
            return Ok(cached);
        }

        if let Some(delay) = delay_before_fetch {
            tokio::time::sleep(delay).await;
        }

        let result = Arc::new(self.client.fetch_availability(date, from, to).await?);
        self.cache.insert(key, result.clone()).await;

        Ok(result)
    }

    /// Remove every cached entry (called after each poll cycle).
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Cache statistics (for logging).
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Spawn the background sweep for expired entries.
    ///
    /// Runs until the returned handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        let interval = client.cache.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick is immediate, skip it
            loop {
                ticker.tick().await;
                client.cache.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(day: u32) -> TicketKey {
        (
            NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
            Telecode::parse("VNP").unwrap(),
            Telecode::parse("AOH").unwrap(),
        )
    }

    fn payload() -> Arc<TicketQueryResult> {
        Arc::new(TicketQueryResult {
            status: true,
            data: Default::default(),
        })
    }

    fn small_cache(capacity: usize, ttl: Duration) -> TicketCache {
        TicketCache::new(
            CacheConfig::default()
                .with_max_capacity(capacity)
                .with_ttl(ttl),
        )
    }

    #[tokio::test]
    async fn read_within_ttl_returns_written_value() {
        let cache = small_cache(10, Duration::from_secs(300));
        let value = payload();

        cache.insert(key(15), value.clone()).await;

        let hit = cache.get(&key(15)).await.unwrap();
        assert!(Arc::ptr_eq(&hit, &value));
    }

    #[tokio::test(start_paused = true)]
    async fn read_after_ttl_misses_and_removes() {
        let cache = small_cache(10, Duration::from_secs(300));
        cache.insert(key(15), payload()).await;

        tokio::time::advance(Duration::from_secs(301)).await;

        assert!(cache.get(&key(15)).await.is_none());
        // The lazy check removed the entry
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn capacity_overflow_evicts_oldest_inserted() {
        let cache = small_cache(2, Duration::from_secs(300));

        cache.insert(key(10), payload()).await;
        cache.insert(key(11), payload()).await;
        cache.insert(key(12), payload()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&key(10)).await.is_none());
        assert!(cache.get(&key(11)).await.is_some());
        assert!(cache.get(&key(12)).await.is_some());
    }

    #[tokio::test]
    async fn overwriting_a_key_does_not_evict() {
        let cache = small_cache(2, Duration::from_secs(300));

        cache.insert(key(10), payload()).await;
        cache.insert(key(11), payload()).await;
        cache.insert(key(10), payload()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&key(10)).await.is_some());
        assert!(cache.get(&key(11)).await.is_some());
    }

    #[tokio::test]
    async fn clear_empties() {
        let cache = small_cache(10, Duration::from_secs(300));
        cache.insert(key(10), payload()).await;
        cache.insert(key(11), payload()).await;

        cache.clear().await;

        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired() {
        let cache = small_cache(10, Duration::from_secs(300));

        cache.insert(key(10), payload()).await;
        tokio::time::advance(Duration::from_secs(200)).await;
        cache.insert(key(11), payload()).await;
        tokio::time::advance(Duration::from_secs(150)).await;

        // key(10) is 350s old (expired), key(11) is 150s old
        let removed = cache.sweep().await;

        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&key(11)).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stats_distinguish_valid_and_expired() {
        let cache = small_cache(10, Duration::from_secs(300));

        cache.insert(key(10), payload()).await;
        tokio::time::advance(Duration::from_secs(301)).await;
        cache.insert(key(11), payload()).await;

        let stats = cache.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.max_capacity, 10);
    }
}
