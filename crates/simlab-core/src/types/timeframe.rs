//! Bar interval definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Bar interval of a historical series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    #[default]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
}

impl Timeframe {
    /// Interval length in milliseconds.
    pub fn as_millis(&self) -> i64 {
        let secs: i64 = match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Hour1 => 3_600,
            Timeframe::Hour4 => 14_400,
            Timeframe::Daily => 86_400,
            Timeframe::Weekly => 604_800,
        };
        secs * 1_000
    }

    /// Intraday intervals are annualized with the same 365-period year as
    /// daily bars, so callers warn about them.
    pub fn is_intraday(&self) -> bool {
        self.as_millis() < Timeframe::Daily.as_millis()
    }

    /// Number of whole intervals between two timestamps.
    pub fn intervals_between(&self, start_ms: i64, end_ms: i64) -> i64 {
        (end_ms - start_ms) / self.as_millis()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "1h" | "60m" | "hour" => Ok(Timeframe::Hour1),
            "4h" | "240m" => Ok(Timeframe::Hour4),
            "1d" | "d" | "day" | "daily" => Ok(Timeframe::Daily),
            "1w" | "w" | "week" | "weekly" => Ok(Timeframe::Weekly),
            _ => Err(DataError::InvalidTimeframe(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe::Daily);
        assert_eq!("4H".parse::<Timeframe>().unwrap(), Timeframe::Hour4);
        assert!("3d".parse::<Timeframe>().is_err());
        assert_eq!(Timeframe::Minute15.to_string(), "15m");
    }

    #[test]
    fn test_intervals() {
        let day = Timeframe::Daily.as_millis();
        assert_eq!(day, 86_400_000);
        assert_eq!(Timeframe::Daily.intervals_between(0, 180 * day), 180);
        assert!(Timeframe::Hour1.is_intraday());
        assert!(!Timeframe::Weekly.is_intraday());
    }

    #[test]
    fn test_serde_names() {
        let tf: Timeframe = serde_json::from_str("\"1h\"").unwrap();
        assert_eq!(tf, Timeframe::Hour1);
        assert_eq!(serde_json::to_string(&Timeframe::Daily).unwrap(), "\"1d\"");
    }
}
