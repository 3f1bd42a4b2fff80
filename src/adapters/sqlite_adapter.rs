//! SQLite bar source.
//!
//! Reads the `market_ohlcv` table (name configurable), one row per
//! `(date, ticker)`, dates stored as TEXT in `date_format`. The format must
//! sort lexicographically in date order (`%Y%m%d`, `%Y-%m-%d`) because range
//! filtering happens in SQL.
//!
//! Older databases name the traded value `amount` and the market cap
//! `marketcap`, and may lack `high`, `low`, `change_rate`, `market_cap` or
//! `operating_income`. Columns are resolved per query from `PRAGMA
//! table_info`; missing optional columns read as NULL.

use crate::domain::bar::Bar;
use crate::domain::error::ScreenerError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{BarSource, DataRange};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEFAULT_TABLE: &str = "market_ohlcv";
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";

/// Select list for one table, in [`Bar`] field order. Absent optional
/// columns become `NULL`.
#[derive(Debug, Clone, PartialEq)]
struct ColumnMap {
    high: &'static str,
    low: &'static str,
    value: &'static str,
    change_rate: &'static str,
    market_cap: &'static str,
    operating_income: &'static str,
}

impl ColumnMap {
    fn resolve(table: &str, present: &HashSet<String>) -> Result<Self, ScreenerError> {
        if present.is_empty() {
            return Err(ScreenerError::DatabaseQuery {
                reason: format!("table '{table}' does not exist"),
            });
        }
        for required in ["date", "ticker", "name", "open", "close", "volume"] {
            if !present.contains(required) {
                return Err(ScreenerError::DatabaseQuery {
                    reason: format!("table '{table}' has no column '{required}'"),
                });
            }
        }
        let pick = |names: &[&'static str]| -> &'static str {
            names
                .iter()
                .copied()
                .find(|n| present.contains(*n))
                .unwrap_or("NULL")
        };
        let value = pick(&["value", "amount"]);
        if value == "NULL" {
            return Err(ScreenerError::DatabaseQuery {
                reason: format!("table '{table}' has no column 'value' or 'amount'"),
            });
        }
        Ok(Self {
            high: pick(&["high"]),
            low: pick(&["low"]),
            value,
            change_rate: pick(&["change_rate"]),
            market_cap: pick(&["market_cap", "marketcap"]),
            operating_income: pick(&["operating_income"]),
        })
    }

    fn select_list(&self) -> String {
        format!(
            "date, ticker, name, open, {}, {}, close, volume, {}, {}, {}, {}",
            self.high,
            self.low,
            self.value,
            self.change_rate,
            self.market_cap,
            self.operating_income
        )
    }
}

/// A row as stored, before the date is parsed.
struct RawRow {
    date: String,
    bar: Bar,
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
    table: String,
    date_format: String,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScreenerError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| ScreenerError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;
        let table = config
            .get_string("sqlite", "table")
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let date_format = config
            .get_string("sqlite", "date_format")
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        check_table_name(&table)?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| ScreenerError::Database {
                reason: e.to_string(),
            })?;
        debug!(path = %db_path, %table, "opened sqlite source");

        Ok(Self {
            pool,
            table,
            date_format,
        })
    }

    pub fn in_memory() -> Result<Self, ScreenerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| ScreenerError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            table: DEFAULT_TABLE.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        })
    }

    pub fn with_date_format(mut self, date_format: &str) -> Self {
        self.date_format = date_format.to_string();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, ScreenerError> {
        self.pool.get().map_err(|e: r2d2::Error| ScreenerError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), ScreenerError> {
        let conn = self.conn()?;
        let table = &self.table;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                date TEXT NOT NULL,
                ticker TEXT NOT NULL,
                name TEXT,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                volume INTEGER,
                value REAL,
                change_rate REAL,
                market_cap REAL,
                operating_income REAL,
                PRIMARY KEY (date, ticker)
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_date ON {table}(date);"
        ))
        .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Insert or replace rows keyed by `(date, ticker)`.
    pub fn upsert_bars(&self, bars: &[Bar]) -> Result<(), ScreenerError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let sql = format!(
            "INSERT OR REPLACE INTO {} (date, ticker, name, open, high, low, close, volume,
                 value, change_rate, market_cap, operating_income)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            self.table
        );
        for bar in bars {
            tx.execute(
                &sql,
                params![
                    bar.date.format(&self.date_format).to_string(),
                    bar.ticker,
                    bar.name,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.value,
                    bar.change_rate,
                    bar.market_cap,
                    bar.operating_income
                ],
            )
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn columns(
        &self,
        conn: &PooledConnection<SqliteConnectionManager>,
    ) -> Result<ColumnMap, ScreenerError> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", self.table))
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .and_then(|rows| rows.collect::<Result<HashSet<String>, _>>())
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        ColumnMap::resolve(&self.table, &names)
    }

    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), &self.date_format).ok()
    }
}

fn check_table_name(table: &str) -> Result<(), ScreenerError> {
    let valid = !table.is_empty()
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ScreenerError::ConfigInvalid {
            section: "sqlite".into(),
            key: "table".into(),
            reason: format!("'{table}' is not a plain table name"),
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    let volume: Option<f64> = row.get(7)?;
    Ok(RawRow {
        date: row.get(0)?,
        bar: Bar {
            date: NaiveDate::MIN,
            ticker: row.get(1)?,
            name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            open: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
            high: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            low: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
            close: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            volume: volume.unwrap_or(0.0) as i64,
            value: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
            change_rate: row.get(9)?,
            market_cap: row.get(10)?,
            operating_income: row.get(11)?,
        },
    })
}

impl BarSource for SqliteAdapter {
    fn fetch_bars(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, ScreenerError> {
        let conn = self.conn()?;
        let columns = self.columns(&conn)?;

        let query = format!(
            "SELECT {} FROM {} WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC, ticker ASC",
            columns.select_list(),
            self.table
        );
        let mut stmt = conn
            .prepare(&query)
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let start_str = start.format(&self.date_format).to_string();
        let end_str = end.format(&self.date_format).to_string();
        let rows = stmt
            .query_map(params![start_str, end_str], read_row)
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut bars = Vec::new();
        for row in rows {
            let raw = row.map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;
            match self.parse_date(&raw.date) {
                Some(date) => bars.push(Bar { date, ..raw.bar }),
                None => warn!(date = %raw.date, ticker = %raw.bar.ticker, "skipping row with unparseable date"),
            }
        }
        debug!(%start, %end, rows = bars.len(), "fetched bars");

        Ok(bars)
    }

    fn trading_days(&self) -> Result<Vec<NaiveDate>, ScreenerError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT DISTINCT date FROM {} WHERE close IS NOT NULL AND close <> 0",
            self.table
        );
        let mut stmt = conn
            .prepare(&query)
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut days: Vec<NaiveDate> = raw
            .iter()
            .filter_map(|s| {
                let parsed = self.parse_date(s);
                if parsed.is_none() {
                    warn!(date = %s, "skipping unparseable trading day");
                }
                parsed
            })
            .collect();
        days.sort_unstable();
        days.dedup();
        Ok(days)
    }

    fn data_range(&self) -> Result<Option<DataRange>, ScreenerError> {
        let days = self.trading_days()?;
        let (Some(first), Some(last)) = (days.first().copied(), days.last().copied()) else {
            return Ok(None);
        };

        let conn = self.conn()?;
        let query = format!(
            "SELECT COUNT(*), COUNT(DISTINCT ticker) FROM {}",
            self.table
        );
        let (rows, tickers): (i64, i64) = conn
            .query_row(&query, [], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e: rusqlite::Error| ScreenerError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(Some(DataRange {
            first,
            last,
            trading_days: days.len(),
            tickers: tickers as usize,
            rows: rows as usize,
        }))
    }
}
