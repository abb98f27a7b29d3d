//! Data caching.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use simlab_core::types::{Bar, Timeframe};
use tracing::debug;

/// Identity of one load request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: i64,
    pub end: i64,
    pub exchange: Option<String>,
}

impl CacheKey {
    pub fn new(
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exchange: Option<&str>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
            start: start.timestamp_millis(),
            end: end.timestamp_millis(),
            exchange: exchange.map(str::to_string),
        }
    }
}

struct CacheEntry {
    bars: Vec<Bar>,
    inserted: Instant,
}

/// In-memory bar cache with a time-to-live and a size cap.
///
/// Expired entries are never returned. When full, expired entries are
/// dropped first, then the oldest insertions.
pub struct DataCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl DataCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached bars, if present and not expired.
    pub fn get(&self, key: &CacheKey) -> Option<&[Bar]> {
        self.entries
            .get(key)
            .filter(|entry| entry.inserted.elapsed() < self.ttl)
            .map(|entry| entry.bars.as_slice())
    }

    /// Store bars, evicting as needed to stay within `max_entries`.
    pub fn put(&mut self, key: CacheKey, bars: Vec<Bar>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.purge_expired();
            while self.entries.len() >= self.max_entries {
                let Some(oldest) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                debug!(symbol = %oldest.symbol, "Evicting oldest cache entry");
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                bars,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted.elapsed() < ttl);
        before - self.entries.len()
    }

    /// Clear every entry for a symbol.
    pub fn clear(&mut self, symbol: &str) {
        self.entries.retain(|k, _| k.symbol != symbol);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: &str) -> CacheKey {
        CacheKey {
            symbol: symbol.to_string(),
            timeframe: Timeframe::Daily,
            start: 0,
            end: 1_000,
            exchange: None,
        }
    }

    #[test]
    fn test_get_and_put() {
        let mut cache = DataCache::new(Duration::from_secs(60), 10);
        assert!(cache.get(&key("AAA")).is_none());

        cache.put(key("AAA"), vec![Bar::flat(0, 1.0)]);
        assert_eq!(cache.get(&key("AAA")).map(|b| b.len()), Some(1));
        assert!(cache.get(&key("BBB")).is_none());
    }

    #[test]
    fn test_expired_entries_are_hidden() {
        let mut cache = DataCache::new(Duration::ZERO, 10);
        cache.put(key("AAA"), vec![Bar::flat(0, 1.0)]);

        assert!(cache.get(&key("AAA")).is_none());
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut cache = DataCache::new(Duration::from_secs(60), 2);
        cache.put(key("AAA"), Vec::new());
        std::thread::sleep(Duration::from_millis(2));
        cache.put(key("BBB"), Vec::new());
        std::thread::sleep(Duration::from_millis(2));
        cache.put(key("CCC"), Vec::new());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("AAA")).is_none());
        assert!(cache.get(&key("BBB")).is_some());
        assert!(cache.get(&key("CCC")).is_some());
    }

    #[test]
    fn test_replacing_does_not_evict() {
        let mut cache = DataCache::new(Duration::from_secs(60), 2);
        cache.put(key("AAA"), Vec::new());
        cache.put(key("BBB"), Vec::new());
        cache.put(key("BBB"), vec![Bar::flat(0, 1.0)]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("AAA")).is_some());
    }

    #[test]
    fn test_clear_symbol() {
        let mut cache = DataCache::new(Duration::from_secs(60), 10);
        cache.put(key("AAA"), Vec::new());
        cache.put(key("BBB"), Vec::new());
        cache.clear("AAA");

        assert_eq!(cache.len(), 1);
        cache.clear_all();
        assert!(cache.is_empty());
    }
}
