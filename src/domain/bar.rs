//! Daily bar representation.
//!
//! One row of the market table: a ticker's trading activity on one day.
//! `(date, ticker)` is the natural key. A bar with `close == 0` marks a
//! halted or delisted day and is dropped before any window is built.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub ticker: String,
    pub name: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    /// Traded currency value for the day.
    pub value: f64,
    /// Percent change as reported by the data provider.
    pub change_rate: Option<f64>,
    pub market_cap: Option<f64>,
    /// Latest reported quarterly operating income; refreshed far less often
    /// than prices.
    pub operating_income: Option<f64>,
}

impl Bar {
    pub fn is_trading(&self) -> bool {
        self.close != 0.0
    }

    /// Provider change rate, or `(close - open) / open * 100` when absent.
    ///
    /// Returns `None` when neither is available (no provider value and a
    /// zero open).
    pub fn change_rate(&self) -> Option<f64> {
        match self.change_rate {
            Some(rate) => Some(rate),
            None if self.open != 0.0 => Some((self.close - self.open) / self.open * 100.0),
            None => None,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.change_rate().is_some_and(|r| r > 0.0)
    }

    pub fn is_negative(&self) -> bool {
        self.change_rate().is_some_and(|r| r < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2025, 7, 11).unwrap(),
            ticker: "005930".into(),
            name: "삼성전자".into(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000,
            value: 5_250_000.0,
            change_rate: None,
            market_cap: None,
            operating_income: None,
        }
    }

    #[test]
    fn provider_change_rate_wins() {
        let bar = Bar {
            change_rate: Some(-1.5),
            ..sample_bar()
        };
        assert_eq!(bar.change_rate(), Some(-1.5));
        assert!(bar.is_negative());
        assert!(!bar.is_positive());
    }

    #[test]
    fn derived_change_rate_from_candle() {
        let bar = sample_bar();
        // (105 - 100) / 100 * 100 = 5
        assert!((bar.change_rate().unwrap() - 5.0).abs() < f64::EPSILON);
        assert!(bar.is_positive());
    }

    #[test]
    fn zero_change_is_neither_direction() {
        let bar = Bar {
            change_rate: Some(0.0),
            ..sample_bar()
        };
        assert!(!bar.is_positive());
        assert!(!bar.is_negative());
    }

    #[test]
    fn zero_open_without_provider_rate_has_no_direction() {
        let bar = Bar {
            open: 0.0,
            ..sample_bar()
        };
        assert_eq!(bar.change_rate(), None);
        assert!(!bar.is_positive());
        assert!(!bar.is_negative());
    }

    #[test]
    fn zero_close_is_not_trading() {
        let bar = Bar {
            close: 0.0,
            ..sample_bar()
        };
        assert!(!bar.is_trading());
        assert!(sample_bar().is_trading());
    }
}
