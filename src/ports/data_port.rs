//! Market data access port.
//!
//! The storage collaborator hands over raw rows. Removing zero-close rows
//! is left to the domain.

use crate::domain::bar::Bar;
use crate::domain::error::ScreenerError;
use chrono::NaiveDate;

/// Summary of what a source holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub trading_days: usize,
    pub tickers: usize,
    pub rows: usize,
}

pub trait BarSource {
    /// All rows with `start <= date <= end`.
    fn fetch_bars(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, ScreenerError>;

    /// Distinct dates carrying at least one non-zero close, ascending.
    fn trading_days(&self) -> Result<Vec<NaiveDate>, ScreenerError>;

    fn data_range(&self) -> Result<Option<DataRange>, ScreenerError>;
}
