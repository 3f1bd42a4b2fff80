//! Trading calendar lookups.
//!
//! The calendar is the sorted, deduplicated set of dates that carry at
//! least one trading bar. Lookups snap arbitrary calendar dates onto it.

use crate::domain::bar::Bar;
use crate::domain::error::ScreenerError;
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingCalendar {
    days: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Build a calendar from any set of dates. Fails on an empty input.
    pub fn new<I>(days: I) -> Result<Self, ScreenerError>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let unique: BTreeSet<NaiveDate> = days.into_iter().collect();
        if unique.is_empty() {
            return Err(ScreenerError::EmptyCalendar);
        }
        Ok(Self {
            days: unique.into_iter().collect(),
        })
    }

    /// Calendar of the dates carrying at least one non-zero-close bar.
    pub fn from_bars(bars: &[Bar]) -> Result<Self, ScreenerError> {
        Self::new(bars.iter().filter(|b| b.is_trading()).map(|b| b.date))
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> NaiveDate {
        self.days[0]
    }

    pub fn last(&self) -> NaiveDate {
        self.days[self.days.len() - 1]
    }

    /// `target` itself if it is a trading day, else the latest trading day
    /// before it. Dates before the whole series snap to the first day.
    pub fn prev_trading_day(&self, target: NaiveDate) -> NaiveDate {
        snap_back(&self.days, target)
    }

    /// The `n` most recent trading days at or before `end`, newest first.
    /// Returns fewer when the series is shorter.
    pub fn recent_trading_days(&self, end: NaiveDate, n: usize) -> Vec<NaiveDate> {
        take_recent(&self.days, end, n)
    }
}

fn snap_back(days: &[NaiveDate], target: NaiveDate) -> NaiveDate {
    match days.binary_search(&target) {
        Ok(_) => target,
        Err(0) => days[0],
        Err(idx) => days[idx - 1],
    }
}

fn take_recent(days: &[NaiveDate], end: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let upto = days.partition_point(|d| *d <= end);
    days[..upto].iter().rev().take(n).copied().collect()
}

/// Parse `YYYY-MM-DD` or the compact `YYYYMMDD` storage form.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

/// Free-function form over a raw day list.
///
/// `days` must be sorted ascending and distinct.
pub fn prev_trading_day(days: &[NaiveDate], target: NaiveDate) -> Result<NaiveDate, ScreenerError> {
    if days.is_empty() {
        return Err(ScreenerError::EmptyCalendar);
    }
    Ok(snap_back(days, target))
}

/// Free-function form of [`TradingCalendar::recent_trading_days`].
pub fn recent_trading_days(
    days: &[NaiveDate],
    end: NaiveDate,
    n: usize,
) -> Result<Vec<NaiveDate>, ScreenerError> {
    if days.is_empty() {
        return Err(ScreenerError::EmptyCalendar);
    }
    Ok(take_recent(days, end, n))
}
