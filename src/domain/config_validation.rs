//! Configuration validation.
//!
//! Checks the `[screen]` and `[thresholds]` sections before a query runs.

use crate::domain::error::ScreenerError;
use crate::domain::filter_parser;
use crate::domain::predicate::Thresholds;
use crate::ports::config_port::ConfigPort;

pub fn validate_screen_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_dates(config)?;
    validate_window_days(config)?;
    validate_thresholds(config)?;
    validate_filters(config)?;
    Ok(())
}

pub fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    check_number(config, "min_value", |v| v >= 0.0, "min_value must be non-negative")?;
    check_number(config, "max_runup", |v| v > 0.0, "max_runup must be positive")?;
    check_number(config, "min_close", |v| v >= 0.0, "min_close must be non-negative")?;
    validate_shell_marker(config)?;
    validate_common_suffix(config)?;
    check_number(
        config,
        "min_market_cap",
        |v| v >= 0.0,
        "min_market_cap must be non-negative",
    )?;
    check_number(config, "min_operating_income", |_| true, "")?;
    Ok(())
}

/// A finite number, or `None` when the key is absent.
///
/// Text that does not parse, `NaN` and infinities are rejected rather than
/// replaced by a default.
pub fn read_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, ScreenerError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid(
            section,
            key,
            &format!("'{}' is not a finite number", raw.trim()),
        )),
    }
}

/// A whole number, or `None` when the key is absent.
pub fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, ScreenerError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<i64>()
        .map(Some)
        .map_err(|_| invalid(section, key, &format!("'{}' is not a whole number", raw.trim())))
}

fn invalid(section: &str, key: &str, reason: &str) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn check_number(
    config: &dyn ConfigPort,
    key: &str,
    accept: fn(f64) -> bool,
    reason: &str,
) -> Result<(), ScreenerError> {
    match read_number(config, "thresholds", key)? {
        Some(v) if !accept(v) => Err(invalid("thresholds", key, reason)),
        _ => Ok(()),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let start = config.get_date("screen", "start_date")?;
    let end = config.get_date("screen", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid(
                "screen",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

fn validate_window_days(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    match read_count(config, "screen", "window_days")? {
        Some(v) if v < 1 => Err(invalid(
            "screen",
            "window_days",
            "window_days must be at least 1",
        )),
        _ => Ok(()),
    }
}

fn validate_shell_marker(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    match config.get_string("thresholds", "shell_marker") {
        Some(s) if s.trim().is_empty() => Err(invalid(
            "thresholds",
            "shell_marker",
            "shell_marker must not be blank",
        )),
        _ => Ok(()),
    }
}

fn validate_common_suffix(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    match config.get_string("thresholds", "common_suffix") {
        Some(s) if s.trim().chars().count() != 1 => Err(invalid(
            "thresholds",
            "common_suffix",
            "common_suffix must be a single character",
        )),
        _ => Ok(()),
    }
}

fn validate_filters(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(text) = config.get_string("screen", "filters") {
        filter_parser::parse(&text, &Thresholds::default())?;
    }
    Ok(())
}
