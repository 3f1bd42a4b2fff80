//! Screening predicates.
//!
//! Each predicate maps a period window and the day slices to the set of
//! tickers that pass it. Predicates never fail: a missing slice or a
//! missing field simply keeps the ticker out of the set.
//!
//! | name              | passes when                                              |
//! |-------------------|----------------------------------------------------------|
//! | `pos{i}`          | change rate > 0 on day slice `i`                         |
//! | `neg{i}`          | change rate < 0 on day slice `i`                         |
//! | `liquidity`       | max traded value over the window >= `min_value`          |
//! | `runup_bounded`   | slice-0 close / window min close < `max_runup`           |
//! | `quality_exclude` | not a shell listing, common share, close >= `min_close`  |
//! | `market_cap`      | slice-0 market cap >= `min_market_cap`                   |
//! | `operating_income`| slice-0 operating income > `min_operating_income`        |
//! | `quality`         | `liquidity` AND `runup_bounded` AND `quality_exclude`    |

use crate::domain::bar::Bar;
use crate::domain::exclusion;
use crate::domain::window::{DaySlice, DaySlices, PeriodWindow};
use std::collections::BTreeSet;
use std::fmt;

/// Unordered set of unique ticker identifiers.
pub type TickerSet = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Positive(usize),
    Negative(usize),
    Liquidity,
    RunupBounded,
    QualityExclude,
    MarketCap,
    OperatingIncome,
    Quality,
}

impl FilterKind {
    /// Parse a filter name. Accepts the dashboard aliases `value_cond`,
    /// `price_cond` and `spc`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let lookback = |prefix: &str| -> Option<usize> {
            let digits = lower.strip_prefix(prefix)?;
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok()
        };
        if let Some(i) = lookback("pos") {
            return Some(Self::Positive(i));
        }
        if let Some(i) = lookback("neg") {
            return Some(Self::Negative(i));
        }
        match lower.as_str() {
            "liquidity" | "value_cond" => Some(Self::Liquidity),
            "runup_bounded" | "price_cond" => Some(Self::RunupBounded),
            "quality_exclude" | "spc" => Some(Self::QualityExclude),
            "market_cap" => Some(Self::MarketCap),
            "operating_income" => Some(Self::OperatingIncome),
            "quality" => Some(Self::Quality),
            _ => None,
        }
    }

    /// Day-slice offset this filter reads, for the candle filters.
    pub fn lookback(&self) -> Option<usize> {
        match self {
            Self::Positive(i) | Self::Negative(i) => Some(*i),
            _ => None,
        }
    }

    /// Dashboard label.
    pub fn label(&self, thresholds: &Thresholds) -> String {
        match self {
            Self::Positive(i) => format!("D-{i} 양봉"),
            Self::Negative(i) => format!("D-{i} 음봉"),
            Self::Liquidity => format!("거래대금 ≥{}", format_eok(thresholds.min_value)),
            Self::RunupBounded => format!("종가 상승 <{}배", thresholds.max_runup),
            Self::QualityExclude => {
                format!("스팩/우선주 제외/종가{}원 이상", thresholds.min_close)
            }
            Self::MarketCap => format!("시가총액 ≥{}", format_eok(thresholds.min_market_cap)),
            Self::OperatingIncome => {
                format!("영업이익 >{}", format_eok(thresholds.min_operating_income))
            }
            Self::Quality => "우량주 필터".to_string(),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive(i) => write!(f, "pos{i}"),
            Self::Negative(i) => write!(f, "neg{i}"),
            Self::Liquidity => write!(f, "liquidity"),
            Self::RunupBounded => write!(f, "runup_bounded"),
            Self::QualityExclude => write!(f, "quality_exclude"),
            Self::MarketCap => write!(f, "market_cap"),
            Self::OperatingIncome => write!(f, "operating_income"),
            Self::Quality => write!(f, "quality"),
        }
    }
}

/// Amounts in 억 (1e8) units, the way the dashboard shows them.
fn format_eok(amount: f64) -> String {
    let eok = amount / 1e8;
    if eok.fract() == 0.0 {
        format!("{}억", eok as i64)
    } else {
        format!("{eok}억")
    }
}

/// Cutoffs used by the predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub min_value: f64,
    pub max_runup: f64,
    pub min_close: f64,
    /// Name fragment marking a shell (SPAC) listing.
    pub shell_marker: String,
    /// Final ticker character of a common share class.
    pub common_suffix: char,
    pub min_market_cap: f64,
    pub min_operating_income: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_value: 50_000_000_000.0,
            max_runup: 3.0,
            min_close: 1_000.0,
            shell_marker: "스팩".to_string(),
            common_suffix: '0',
            min_market_cap: 100_000_000_000.0,
            min_operating_income: 0.0,
        }
    }
}

/// Inputs shared by every predicate of one query.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'q, 'a> {
    pub period: &'q PeriodWindow<'a>,
    pub slices: &'q DaySlices<'a>,
    pub thresholds: &'q Thresholds,
}

pub fn evaluate(kind: FilterKind, ctx: &EvalContext<'_, '_>) -> TickerSet {
    let latest = ctx.slices.latest();
    match kind {
        FilterKind::Positive(i) => positive(ctx.slices.get(i)),
        FilterKind::Negative(i) => negative(ctx.slices.get(i)),
        FilterKind::Liquidity => liquidity(ctx.period, ctx.thresholds.min_value),
        FilterKind::RunupBounded => runup_bounded(ctx.period, latest, ctx.thresholds.max_runup),
        FilterKind::QualityExclude => quality_exclude(latest, ctx.thresholds),
        FilterKind::MarketCap => market_cap(latest, ctx.thresholds.min_market_cap),
        FilterKind::OperatingIncome => {
            operating_income(latest, ctx.thresholds.min_operating_income)
        }
        FilterKind::Quality => exclusion::quality(ctx),
    }
}

/// Number of tickers the predicate selects on its own.
pub fn cardinality(kind: FilterKind, ctx: &EvalContext<'_, '_>) -> usize {
    evaluate(kind, ctx).len()
}

pub fn positive(slice: Option<&DaySlice<'_>>) -> TickerSet {
    select(slice, |b| b.is_positive())
}

pub fn negative(slice: Option<&DaySlice<'_>>) -> TickerSet {
    select(slice, |b| b.is_negative())
}

pub fn liquidity(period: &PeriodWindow<'_>, min_value: f64) -> TickerSet {
    period
        .max_value_by_ticker()
        .into_iter()
        .filter(|(_, max)| *max >= min_value)
        .map(|(t, _)| t.to_string())
        .collect()
}

/// Tickers whose latest close is less than `max_runup` times their lowest
/// close in the window. Tickers missing from either side are left out.
pub fn runup_bounded(
    period: &PeriodWindow<'_>,
    latest: Option<&DaySlice<'_>>,
    max_runup: f64,
) -> TickerSet {
    let Some(latest) = latest else {
        return TickerSet::new();
    };
    let min_close = period.min_close_by_ticker();
    latest
        .bars()
        .filter(|b| {
            min_close
                .get(b.ticker.as_str())
                .is_some_and(|min| b.close / min < max_runup)
        })
        .map(|b| b.ticker.clone())
        .collect()
}

pub fn quality_exclude(latest: Option<&DaySlice<'_>>, thresholds: &Thresholds) -> TickerSet {
    select(latest, |b| {
        !b.name.contains(thresholds.shell_marker.as_str())
            && b.ticker.ends_with(thresholds.common_suffix)
            && b.close >= thresholds.min_close
    })
}

pub fn market_cap(latest: Option<&DaySlice<'_>>, min_market_cap: f64) -> TickerSet {
    select(latest, |b| b.market_cap.is_some_and(|cap| cap >= min_market_cap))
}

pub fn operating_income(latest: Option<&DaySlice<'_>>, min_operating_income: f64) -> TickerSet {
    select(latest, |b| {
        b.operating_income
            .is_some_and(|income| income > min_operating_income)
    })
}

fn select<F>(slice: Option<&DaySlice<'_>>, keep: F) -> TickerSet
where
    F: Fn(&Bar) -> bool,
{
    match slice {
        Some(slice) => slice
            .bars()
            .filter(|b| keep(*b))
            .map(|b| b.ticker.clone())
            .collect(),
        None => TickerSet::new(),
    }
}
