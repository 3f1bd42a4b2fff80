#![allow(dead_code)]

use barscreen::domain::bar::Bar;
use barscreen::domain::error::ScreenerError;
use barscreen::ports::data_port::{BarSource, DataRange};
use chrono::{Datelike, NaiveDate};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// In-memory bar source that records every fetch range it is asked for.
pub struct MockBarSource {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
    pub fetches: RefCell<Vec<(NaiveDate, NaiveDate)>>,
}

impl MockBarSource {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            error: None,
            fetches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }

    fn check(&self) -> Result<(), ScreenerError> {
        match &self.error {
            Some(reason) => Err(ScreenerError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, ScreenerError> {
        self.check()?;
        self.fetches.borrow_mut().push((start, end));
        Ok(self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect())
    }

    fn trading_days(&self) -> Result<Vec<NaiveDate>, ScreenerError> {
        self.check()?;
        let days: BTreeSet<NaiveDate> = self
            .bars
            .iter()
            .filter(|b| b.close != 0.0)
            .map(|b| b.date)
            .collect();
        Ok(days.into_iter().collect())
    }

    fn data_range(&self) -> Result<Option<DataRange>, ScreenerError> {
        let days = self.trading_days()?;
        match (days.first(), days.last()) {
            (Some(first), Some(last)) => Ok(Some(DataRange {
                first: *first,
                last: *last,
                trading_days: days.len(),
                tickers: self
                    .bars
                    .iter()
                    .map(|b| b.ticker.as_str())
                    .collect::<BTreeSet<_>>()
                    .len(),
                rows: self.bars.len(),
            })),
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A bar with `open == close`, a provider change rate and the given value.
pub fn make_bar(ticker: &str, day: &str, close: f64, change_rate: f64, value: f64) -> Bar {
    Bar {
        date: NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
        ticker: ticker.to_string(),
        name: format!("종목{ticker}"),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
        value,
        change_rate: Some(change_rate),
        market_cap: None,
        operating_income: None,
    }
}

pub fn named(bar: Bar, name: &str) -> Bar {
    Bar {
        name: name.to_string(),
        ..bar
    }
}

/// One bar per day for `ticker` over consecutive weekdays starting at `start`.
pub fn daily_series(ticker: &str, start: &str, closes: &[f64], value: f64) -> Vec<Bar> {
    let mut day = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
    let mut bars = Vec::with_capacity(closes.len());
    for close in closes {
        while day.weekday().number_from_monday() > 5 {
            day = day.succ_opt().unwrap();
        }
        bars.push(Bar {
            date: day,
            ..make_bar(ticker, "2000-01-01", *close, 0.0, value)
        });
        day = day.succ_opt().unwrap();
    }
    bars
}
