//! Configuration access port.

use crate::domain::calendar::parse_day;
use crate::domain::error::ScreenerError;
use chrono::NaiveDate;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Optional date in `YYYY-MM-DD` or `YYYYMMDD` form. Blank counts as unset.
    fn get_date(&self, section: &str, key: &str) -> Result<Option<NaiveDate>, ScreenerError> {
        match self.get_string(section, key) {
            Some(raw) if !raw.trim().is_empty() => parse_day(&raw)
                .map(Some)
                .ok_or_else(|| ScreenerError::ConfigInvalid {
                    section: section.to_string(),
                    key: key.to_string(),
                    reason: format!("invalid date '{}', expected YYYY-MM-DD", raw.trim()),
                }),
            _ => Ok(None),
        }
    }
}
