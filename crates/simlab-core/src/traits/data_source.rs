//! Historical data source trait.

use crate::error::DataError;
use crate::types::{Bar, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Supplier of historical bars.
///
/// Implementations return bars de-duplicated and in ascending timestamp
/// order. Gap detection is left to the caller.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Load bars for `symbol` in `[start, end]`.
    ///
    /// # Arguments
    /// * `symbol` - Instrument identifier
    /// * `timeframe` - Bar interval
    /// * `start` / `end` - Inclusive date range
    /// * `exchange` - Venue hint for sources that serve several exchanges
    async fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exchange: Option<&str>,
    ) -> Result<Vec<Bar>, DataError>;

    /// Source name, used in logs.
    fn name(&self) -> &str;
}
