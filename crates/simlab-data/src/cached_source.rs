//! Cache-through data source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simlab_core::error::DataError;
use simlab_core::traits::DataSource;
use simlab_core::types::{Bar, Timeframe};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{CacheKey, DataCache};

/// Wraps a source with an owned [`DataCache`].
pub struct CachedDataSource<S> {
    inner: S,
    cache: Mutex<DataCache>,
}

impl<S: DataSource> CachedDataSource<S> {
    pub fn new(inner: S, cache: DataCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn invalidate(&self, symbol: &str) {
        self.cache.lock().await.clear(symbol);
    }
}

#[async_trait]
impl<S: DataSource> DataSource for CachedDataSource<S> {
    async fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exchange: Option<&str>,
    ) -> Result<Vec<Bar>, DataError> {
        let key = CacheKey::new(symbol, timeframe, start, end, exchange);
        if let Some(bars) = self.cache.lock().await.get(&key) {
            debug!(symbol, "Cache hit");
            return Ok(bars.to_vec());
        }

        let bars = self.inner.load(symbol, timeframe, start, end, exchange).await?;
        self.cache.lock().await.put(key, bars.clone());
        Ok(bars)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for Counting {
        async fn load(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _exchange: Option<&str>,
        ) -> Result<Vec<Bar>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Bar::flat(0, 1.0)])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_second_load_hits_cache() {
        let source = CachedDataSource::new(Counting::default(), DataCache::new(Duration::from_secs(60), 8));
        let now = Utc::now();

        source.load("AAA", Timeframe::Daily, now, now, None).await.unwrap();
        source.load("AAA", Timeframe::Daily, now, now, None).await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);

        source.load("AAA", Timeframe::Hour1, now, now, None).await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.cached_entries().await, 2);

        source.invalidate("AAA").await;
        source.load("AAA", Timeframe::Daily, now, now, None).await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 3);
    }
}
