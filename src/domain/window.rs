//! Period windows and single-day slices over a loaded bar snapshot.
//!
//! A [`MarketData`] owns one query's bars (zero-close rows already
//! removed) and the trading calendar. Windows borrow from it and never
//! mutate it.
//!
//! Day slices are resolved independently per offset: offset `i` snaps
//! `reference - i` calendar days back onto the calendar. Offsets are not
//! chained from one another, so across a long enough gap two offsets can
//! resolve to the same day.

use crate::domain::bar::Bar;
use crate::domain::calendar::TradingCalendar;
use crate::domain::error::ScreenerError;
use chrono::{Days, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct MarketData {
    bars: Vec<Bar>,
    calendar: TradingCalendar,
}

impl MarketData {
    /// Snapshot over `bars` using an externally supplied calendar.
    pub fn new(bars: Vec<Bar>, calendar: TradingCalendar) -> Self {
        let bars: Vec<Bar> = bars.into_iter().filter(Bar::is_trading).collect();
        Self { bars, calendar }
    }

    /// Snapshot whose calendar is derived from the bars themselves.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, ScreenerError> {
        let calendar = TradingCalendar::from_bars(&bars)?;
        Ok(Self::new(bars, calendar))
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// All bars with `start <= date <= end`.
    pub fn period_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PeriodWindow<'_>, ScreenerError> {
        let bars: Vec<&Bar> = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        if bars.is_empty() {
            return Err(ScreenerError::EmptyWindow { start, end });
        }
        Ok(PeriodWindow { start, end, bars })
    }

    /// The trading day an offset resolves to.
    pub fn resolve_offset(&self, reference: NaiveDate, offset: usize) -> NaiveDate {
        let target = reference
            .checked_sub_days(Days::new(offset as u64))
            .unwrap_or(NaiveDate::MIN);
        self.calendar.prev_trading_day(target)
    }

    pub fn day_slice(&self, reference: NaiveDate, offset: usize) -> DaySlice<'_> {
        let date = self.resolve_offset(reference, offset);
        let bars = self
            .bars
            .iter()
            .filter(|b| b.date == date)
            .map(|b| (b.ticker.as_str(), b))
            .collect();
        DaySlice { offset, date, bars }
    }

    pub fn day_slices<I>(&self, reference: NaiveDate, offsets: I) -> DaySlices<'_>
    where
        I: IntoIterator<Item = usize>,
    {
        let slices = offsets
            .into_iter()
            .map(|offset| (offset, self.day_slice(reference, offset)))
            .collect();
        DaySlices { slices }
    }
}

/// Bars inside an inclusive date range, used for multi-day aggregation.
#[derive(Debug, Clone)]
pub struct PeriodWindow<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    bars: Vec<&'a Bar>,
}

impl<'a> PeriodWindow<'a> {
    pub fn bars(&self) -> &[&'a Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn tickers(&self) -> BTreeSet<&'a str> {
        self.bars.iter().map(|b| b.ticker.as_str()).collect()
    }

    /// Largest single-day traded value per ticker.
    pub fn max_value_by_ticker(&self) -> HashMap<&'a str, f64> {
        let mut out: HashMap<&'a str, f64> = HashMap::new();
        for bar in &self.bars {
            out.entry(bar.ticker.as_str())
                .and_modify(|v| *v = v.max(bar.value))
                .or_insert(bar.value);
        }
        out
    }

    /// Lowest close per ticker.
    pub fn min_close_by_ticker(&self) -> HashMap<&'a str, f64> {
        let mut out: HashMap<&'a str, f64> = HashMap::new();
        for bar in &self.bars {
            out.entry(bar.ticker.as_str())
                .and_modify(|v| *v = v.min(bar.close))
                .or_insert(bar.close);
        }
        out
    }
}

/// Every bar of exactly one resolved trading day, keyed by ticker.
#[derive(Debug, Clone)]
pub struct DaySlice<'a> {
    pub offset: usize,
    pub date: NaiveDate,
    bars: BTreeMap<&'a str, &'a Bar>,
}

impl<'a> DaySlice<'a> {
    pub fn get(&self, ticker: &str) -> Option<&'a Bar> {
        self.bars.get(ticker).copied()
    }

    pub fn bars(&self) -> impl Iterator<Item = &'a Bar> + '_ {
        self.bars.values().copied()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.bars.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Day slices indexed by lookback offset.
#[derive(Debug, Clone, Default)]
pub struct DaySlices<'a> {
    slices: BTreeMap<usize, DaySlice<'a>>,
}

impl<'a> DaySlices<'a> {
    pub fn get(&self, offset: usize) -> Option<&DaySlice<'a>> {
        self.slices.get(&offset)
    }

    pub fn latest(&self) -> Option<&DaySlice<'a>> {
        self.get(0)
    }

    /// `(offset, resolved date)` pairs in offset order.
    pub fn resolved_days(&self) -> Vec<(usize, NaiveDate)> {
        self.slices.iter().map(|(o, s)| (*o, s.date)).collect()
    }
}
