//! Historical bar sources for simulation runs.

mod cache;
mod cached_source;
mod csv_source;
mod gaps;

pub use cache::{CacheKey, DataCache};
pub use cached_source::CachedDataSource;
pub use csv_source::{load_csv, CsvDataSource};
pub use gaps::{detect_gaps, Gap};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use simlab_core::traits::DataSource;
use simlab_core::types::{Bar, Timeframe};
use tracing::{info, warn};

/// Load several symbols concurrently.
///
/// A symbol that fails to load is logged and mapped to an empty series, so
/// the engine reports it as skipped instead of failing the whole batch.
pub async fn load_symbols(
    source: &dyn DataSource,
    symbols: &[String],
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exchange: Option<&str>,
) -> BTreeMap<String, Vec<Bar>> {
    let futures = symbols
        .iter()
        .map(|symbol| source.load(symbol, timeframe, start, end, exchange));
    let results = join_all(futures).await;

    let mut data = BTreeMap::new();
    for (symbol, result) in symbols.iter().zip(results) {
        let bars = match result {
            Ok(bars) => {
                for gap in detect_gaps(&bars, timeframe) {
                    warn!(symbol = %symbol, missing = gap.missing, after = gap.after, "Gap in bar series");
                }
                bars
            }
            Err(e) => {
                warn!(symbol = %symbol, source = source.name(), error = %e, "Failed to load symbol");
                Vec::new()
            }
        };
        data.insert(symbol.clone(), bars);
    }

    info!(
        symbols = data.len(),
        loaded = data.values().filter(|b| !b.is_empty()).count(),
        "Loaded historical data"
    );
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use simlab_core::error::DataError;

    struct Fixed;

    #[async_trait]
    impl DataSource for Fixed {
        async fn load(
            &self,
            symbol: &str,
            _timeframe: Timeframe,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _exchange: Option<&str>,
        ) -> Result<Vec<Bar>, DataError> {
            match symbol {
                "AAA" => Ok(vec![Bar::flat(0, 10.0), Bar::flat(86_400_000, 11.0)]),
                other => Err(DataError::SymbolNotFound(other.to_string())),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_failed_symbols_become_empty() {
        let symbols = vec!["AAA".to_string(), "ZZZ".to_string()];
        let data = load_symbols(&Fixed, &symbols, Timeframe::Daily, Utc::now(), Utc::now(), None).await;

        assert_eq!(data["AAA"].len(), 2);
        assert!(data["ZZZ"].is_empty());
    }
}
