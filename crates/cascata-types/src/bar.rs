//! OHLCV bar representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV bar at any granularity.
///
/// Timestamps are UTC epoch milliseconds. For minute-series records the
/// timestamp is the bar's minute; for resampled records it is the bucket
/// edge selected by the timeframe's `label` setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    /// Bar timestamp (UTC epoch milliseconds).
    pub timestamp_ms: i64,
    /// Opening price (first source record's open).
    pub open: f64,
    /// Highest price during the period.
    pub high: f64,
    /// Lowest price during the period.
    pub low: f64,
    /// Closing price (last source record's close).
    pub close: f64,
    /// Total volume over the period.
    pub volume: f64,
}

impl BarRecord {
    /// Creates a new bar record.
    #[must_use]
    pub const fn new(
        timestamp_ms: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp_ms,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns the timestamp as a UTC datetime.
    ///
    /// # Panics
    ///
    /// Panics if the stored milliseconds are outside chrono's representable
    /// range, which cannot happen for any value produced by this system.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
            .expect("bar timestamp out of range")
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) bar.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Folds a later record into this bar: high/low extend to cover it,
    /// close and volume take the later record's close and added volume.
    ///
    /// This is the single accumulation rule used both for bucket
    /// aggregation and for the ghost-bucket merge, which keeps the two
    /// paths numerically identical.
    pub fn merge_from(&mut self, later: &Self) {
        self.high = self.high.max(later.high);
        self.low = self.low.min(later.low);
        self.close = later.close;
        self.volume += later.volume;
    }

    /// Rounds the four price fields to the given number of decimals.
    pub fn round_prices(&mut self, decimals: u32) {
        let factor = 10f64.powi(decimals as i32);
        self.open = (self.open * factor).round() / factor;
        self.high = (self.high * factor).round() / factor;
        self.low = (self.low * factor).round() / factor;
        self.close = (self.close * factor).round() / factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_bar() -> BarRecord {
        BarRecord::new(1_700_000_000_000, 1.1000, 1.1050, 1.0980, 1.1020, 1000.0)
    }

    #[test]
    fn test_range_and_body() {
        let bar = create_test_bar();
        assert_relative_eq!(bar.range(), 0.0070, epsilon = 1e-10);
        assert_relative_eq!(bar.body(), 0.0020, epsilon = 1e-10);
        assert!(bar.is_bullish());
    }

    #[test]
    fn test_merge_from() {
        let mut bar = create_test_bar();
        let later = BarRecord::new(1_700_000_060_000, 1.1020, 1.1100, 1.0950, 1.1080, 500.0);
        bar.merge_from(&later);

        assert_relative_eq!(bar.open, 1.1000);
        assert_relative_eq!(bar.high, 1.1100);
        assert_relative_eq!(bar.low, 1.0950);
        assert_relative_eq!(bar.close, 1.1080);
        assert_relative_eq!(bar.volume, 1500.0);
        // Merge never touches the receiving bar's timestamp.
        assert_eq!(bar.timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_round_prices() {
        let mut bar = BarRecord::new(0, 1.23456, 1.23999, 1.23001, 1.23450, 10.0);
        bar.round_prices(3);
        assert_relative_eq!(bar.open, 1.235);
        assert_relative_eq!(bar.high, 1.240);
        assert_relative_eq!(bar.low, 1.230);
        assert_relative_eq!(bar.close, 1.234, epsilon = 1e-12);
    }
}
