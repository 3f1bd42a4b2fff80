//! One screening query, from loaded bars to the recommended list.

use crate::domain::bar::Bar;
use crate::domain::calendar::TradingCalendar;
use crate::domain::error::ScreenerError;
use crate::domain::filter_engine::{self, ConditionCount, FilterSpec};
use crate::domain::predicate::{self, EvalContext, FilterKind, Thresholds, TickerSet};
use crate::domain::window::MarketData;
use crate::ports::data_port::BarSource;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Day slices every query resolves, whether or not a filter reads them.
pub const BASE_OFFSETS: [usize; 3] = [0, 1, 2];

pub const DEFAULT_WINDOW_DAYS: usize = 200;

pub const NO_CONDITIONS: &str = "조건 없음";

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenRequest {
    /// Window start; defaults to the oldest of the last `window_days`
    /// trading days.
    pub start: Option<NaiveDate>,
    /// Window end and reference date; defaults to the latest trading day.
    pub end: Option<NaiveDate>,
    pub window_days: usize,
    pub filters: Vec<FilterSpec>,
    /// Drop shell, preferred and low-priced tickers after the chain.
    pub exclude_spc: bool,
    pub thresholds: Thresholds,
}

impl Default for ScreenRequest {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            window_days: DEFAULT_WINDOW_DAYS,
            filters: Vec::new(),
            exclude_spc: false,
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDay {
    pub offset: usize,
    pub date: NaiveDate,
}

/// A recommended ticker joined to its day-slice-0 bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub rank: usize,
    #[serde(flatten)]
    pub bar: Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resolved_days: Vec<ResolvedDay>,
    pub counts: Vec<ConditionCount>,
    pub summary: String,
    pub recommended: TickerSet,
    pub rows: Vec<ResultRow>,
}

impl ScreenReport {
    pub fn reference_day(&self) -> Option<NaiveDate> {
        self.resolved_days
            .iter()
            .find(|d| d.offset == 0)
            .map(|d| d.date)
    }
}

/// Offsets to resolve for a chain: the base three plus any deeper lookback.
pub fn required_offsets(filters: &[FilterSpec]) -> BTreeSet<usize> {
    BASE_OFFSETS
        .into_iter()
        .chain(filters.iter().filter_map(|f| f.kind.lookback()))
        .collect()
}

/// Concrete `(start, end)` for a request against a calendar.
pub fn resolve_period(calendar: &TradingCalendar, request: &ScreenRequest) -> (NaiveDate, NaiveDate) {
    let end = request.end.unwrap_or_else(|| calendar.last());
    let start = request.start.unwrap_or_else(|| {
        calendar
            .recent_trading_days(end, request.window_days)
            .last()
            .copied()
            .unwrap_or(end)
    });
    (start, end)
}

/// Chain summary with the exclusion toggle appended, connective-less.
pub fn describe(request: &ScreenRequest) -> String {
    let mut parts: Vec<String> = Vec::new();
    let chain = filter_engine::summary(&request.filters);
    if !chain.is_empty() {
        parts.push(chain);
    }
    if request.exclude_spc {
        parts.push(format!(
            "[{}]",
            FilterKind::QualityExclude.label(&request.thresholds)
        ));
    }
    if parts.is_empty() {
        NO_CONDITIONS.to_string()
    } else {
        parts.join(" ")
    }
}

/// Run a request against an already loaded snapshot.
pub fn screen(data: &MarketData, request: &ScreenRequest) -> Result<ScreenReport, ScreenerError> {
    let (start, end) = resolve_period(data.calendar(), request);
    let period = data.period_window(start, end)?;
    info!(%start, %end, bars = period.len(), "period window loaded");

    let slices = data.day_slices(end, required_offsets(&request.filters));
    let resolved_days: Vec<ResolvedDay> = slices
        .resolved_days()
        .into_iter()
        .map(|(offset, date)| ResolvedDay { offset, date })
        .collect();
    for day in &resolved_days {
        let size = slices.get(day.offset).map_or(0, |s| s.len());
        debug!(offset = day.offset, date = %day.date, tickers = size, "resolved day slice");
        if size == 0 {
            warn!(offset = day.offset, date = %day.date, "day slice has no bars");
        }
    }

    let ctx = EvalContext {
        period: &period,
        slices: &slices,
        thresholds: &request.thresholds,
    };
    let chain = filter_engine::run_chain(&request.filters, &ctx);
    let mut recommended = chain.recommended;
    if request.exclude_spc {
        let keep = predicate::evaluate(FilterKind::QualityExclude, &ctx);
        recommended.retain(|t| keep.contains(t));
    }
    info!(count = recommended.len(), "recommendation complete");

    let mut joined: Vec<Bar> = match slices.latest() {
        Some(latest) => recommended
            .iter()
            .filter_map(|t| latest.get(t))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    joined.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    let rows = joined
        .into_iter()
        .enumerate()
        .map(|(i, bar)| ResultRow { rank: i + 1, bar })
        .collect();

    Ok(ScreenReport {
        start,
        end,
        resolved_days,
        counts: chain.counts,
        summary: describe(request),
        recommended,
        rows,
    })
}

/// Load what a request needs from `source` and screen it.
pub fn run_screen(
    source: &dyn BarSource,
    request: &ScreenRequest,
) -> Result<ScreenReport, ScreenerError> {
    let calendar = TradingCalendar::new(source.trading_days()?)?;
    let (start, end) = resolve_period(&calendar, request);
    if start > end {
        return Err(ScreenerError::EmptyWindow { start, end });
    }

    // Day slices may reach before the window start, or past its end when
    // the reference precedes the whole calendar.
    let slice_days: Vec<NaiveDate> = required_offsets(&request.filters)
        .into_iter()
        .map(|offset| {
            end.checked_sub_days(chrono::Days::new(offset as u64))
                .map_or(calendar.first(), |d| calendar.prev_trading_day(d))
        })
        .collect();
    let fetch_start = slice_days.iter().copied().fold(start, NaiveDate::min);
    let fetch_end = slice_days.iter().copied().fold(end, NaiveDate::max);
    debug!(%fetch_start, %fetch_end, "fetching bars");

    let bars = source.fetch_bars(fetch_start, fetch_end)?;
    let data = MarketData::new(bars, calendar);
    let resolved = ScreenRequest {
        start: Some(start),
        end: Some(end),
        ..request.clone()
    };
    screen(&data, &resolved)
}
