//! CSV file bar source.
//!
//! One file holds every row. The header names the columns in any order,
//! using the same names as the SQLite table (`amount` and `marketcap` are
//! accepted for the older layout). Dates may be `YYYY-MM-DD` or `YYYYMMDD`.

use crate::domain::bar::Bar;
use crate::domain::calendar::parse_day;
use crate::domain::error::ScreenerError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{BarSource, DataRange};
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::warn;

pub struct CsvAdapter {
    path: PathBuf,
}

/// Column positions resolved from the header row.
struct Header {
    index: HashMap<String, usize>,
}

impl Header {
    fn new(record: &StringRecord) -> Self {
        let index = record
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect();
        Self { index }
    }

    fn position(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.index.get(*n).copied())
    }

    fn require(&self, names: &[&str]) -> Result<usize, ScreenerError> {
        self.position(names).ok_or_else(|| ScreenerError::Database {
            reason: format!("CSV header has no '{}' column", names[0]),
        })
    }
}

struct Columns {
    date: usize,
    ticker: usize,
    name: Option<usize>,
    open: usize,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: usize,
    value: usize,
    change_rate: Option<usize>,
    market_cap: Option<usize>,
    operating_income: Option<usize>,
}

impl Columns {
    fn resolve(header: &Header) -> Result<Self, ScreenerError> {
        Ok(Self {
            date: header.require(&["date"])?,
            ticker: header.require(&["ticker"])?,
            name: header.position(&["name"]),
            open: header.require(&["open"])?,
            high: header.position(&["high"]),
            low: header.position(&["low"]),
            close: header.require(&["close"])?,
            volume: header.require(&["volume"])?,
            value: header.require(&["value", "amount"])?,
            change_rate: header.position(&["change_rate"]),
            market_cap: header.position(&["market_cap", "marketcap"]),
            operating_income: header.position(&["operating_income"]),
        })
    }

    /// `Ok(None)` for an empty optional cell, `Err` for text that is not a number.
    fn number(record: &StringRecord, pos: Option<usize>) -> Result<Option<f64>, String> {
        match pos.and_then(|i| record.get(i)).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .replace(',', "")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("invalid number '{raw}'")),
        }
    }

    fn bar(&self, record: &StringRecord) -> Result<Bar, String> {
        let text = |i: usize| record.get(i).map(str::trim).unwrap_or_default();
        let required = |i: usize, field: &str| -> Result<f64, String> {
            Self::number(record, Some(i))?.ok_or_else(|| format!("missing {field}"))
        };

        let date = parse_day(text(self.date))
            .ok_or_else(|| format!("invalid date '{}'", text(self.date)))?;
        let ticker = text(self.ticker);
        if ticker.is_empty() {
            return Err("missing ticker".to_string());
        }

        Ok(Bar {
            date,
            ticker: ticker.to_string(),
            name: self.name.map(text).unwrap_or_default().to_string(),
            open: required(self.open, "open")?,
            high: Self::number(record, self.high)?.unwrap_or(0.0),
            low: Self::number(record, self.low)?.unwrap_or(0.0),
            close: required(self.close, "close")?,
            volume: required(self.volume, "volume")? as i64,
            value: required(self.value, "value")?,
            change_rate: Self::number(record, self.change_rate)?,
            market_cap: Self::number(record, self.market_cap)?,
            operating_income: Self::number(record, self.operating_income)?,
        })
    }
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScreenerError> {
        let path = config
            .get_string("csv", "path")
            .ok_or_else(|| ScreenerError::ConfigMissing {
                section: "csv".into(),
                key: "path".into(),
            })?;
        Ok(Self::new(PathBuf::from(path)))
    }

    /// Every well-formed row in file order. Malformed rows are logged and
    /// skipped.
    fn load(&self) -> Result<Vec<Bar>, ScreenerError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| ScreenerError::Database {
                reason: format!("failed to read {}: {}", self.path.display(), e),
            })?;

        let header = Header::new(rdr.headers().map_err(|e| ScreenerError::Database {
            reason: format!("CSV parse error: {}", e),
        })?);
        let columns = Columns::resolve(&header)?;

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| ScreenerError::Database {
                reason: format!("CSV parse error: {}", e),
            })?;
            match columns.bar(&record) {
                Ok(bar) => bars.push(bar),
                Err(reason) => warn!(row = line + 2, %reason, "skipping malformed CSV row"),
            }
        }
        Ok(bars)
    }
}

impl BarSource for CsvAdapter {
    fn fetch_bars(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, ScreenerError> {
        let mut bars: Vec<Bar> = self
            .load()?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        bars.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));
        Ok(bars)
    }

    fn trading_days(&self) -> Result<Vec<NaiveDate>, ScreenerError> {
        let days: BTreeSet<NaiveDate> = self
            .load()?
            .iter()
            .filter(|b| b.is_trading())
            .map(|b| b.date)
            .collect();
        Ok(days.into_iter().collect())
    }

    fn data_range(&self) -> Result<Option<DataRange>, ScreenerError> {
        let bars = self.load()?;
        let days: BTreeSet<NaiveDate> = bars
            .iter()
            .filter(|b| b.is_trading())
            .map(|b| b.date)
            .collect();
        let (Some(first), Some(last)) = (days.first().copied(), days.last().copied()) else {
            return Ok(None);
        };
        let tickers: BTreeSet<&str> = bars.iter().map(|b| b.ticker.as_str()).collect();
        Ok(Some(DataRange {
            first,
            last,
            trading_days: days.len(),
            tickers: tickers.len(),
            rows: bars.len(),
        }))
    }
}
