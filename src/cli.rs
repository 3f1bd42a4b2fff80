//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReport;
use crate::adapters::text_report::TextReport;
use crate::domain::calendar::{parse_day, TradingCalendar};
use crate::domain::config_validation::{
    read_count, read_number, validate_screen_config, validate_thresholds,
};
use crate::domain::error::ScreenerError;
use crate::domain::filter_parser;
use crate::domain::predicate::Thresholds;
use crate::domain::screen::{self, ScreenRequest, DEFAULT_WINDOW_DAYS};
use crate::logging::init_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "barscreen", about = "Daily candle screener over stored market bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a filter chain and print the recommended tickers
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        /// Window start (YYYY-MM-DD or YYYYMMDD)
        #[arg(long, value_parser = parse_date_arg)]
        start: Option<NaiveDate>,
        /// Window end and reference date
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<NaiveDate>,
        /// Filter chain, e.g. "pos0 AND neg1 AND quality"
        #[arg(short, long)]
        filters: Option<String>,
        /// Drop shell listings, preferred shares and cheap tickers
        #[arg(long, overrides_with = "no_exclude_spc")]
        exclude_spc: bool,
        /// Keep them even when `[screen] exclude_spc` is set
        #[arg(long, overrides_with = "exclude_spc")]
        no_exclude_spc: bool,
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the stored data range
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file and its filter chain
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the most recent trading days
    Days {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<NaiveDate>,
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
}

/// Command-line values that take precedence over `[screen]`.
#[derive(Debug, Clone, Default)]
pub struct ScreenOverrides {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub filters: Option<String>,
    /// `None` defers to the config file.
    pub exclude_spc: Option<bool>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Screen {
            config,
            start,
            end,
            filters,
            exclude_spc,
            no_exclude_spc,
            json,
            output,
        } => {
            let exclude_spc = match (exclude_spc, no_exclude_spc) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let overrides = ScreenOverrides {
                start,
                end,
                filters,
                exclude_spc,
            };
            run_screen(&config, &overrides, json, output.as_deref())
        }
        Command::Info { config } => run_info(&config),
        Command::Validate { config } => run_validate(&config),
        Command::Days { config, end, count } => run_days(&config, end, count),
    }
}

pub fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_day(raw).ok_or_else(|| format!("invalid date '{raw}', expected YYYY-MM-DD or YYYYMMDD"))
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Print an error, with a caret under the chain text for parse errors.
pub fn report_error(err: &ScreenerError, filter_text: Option<&str>) -> ExitCode {
    match (err, filter_text) {
        (ScreenerError::FilterParse(e), Some(text)) => {
            eprintln!("error: invalid filter chain:\n{}", e.display_with_context(text));
        }
        _ => eprintln!("error: {err}"),
    }
    ExitCode::from(err)
}

/// The configured bar source: `[csv] path` when set, SQLite otherwise.
pub fn open_source(config: &dyn ConfigPort) -> Result<Box<dyn BarSource>, ScreenerError> {
    if config
        .get_string("csv", "path")
        .is_some_and(|p| !p.trim().is_empty())
    {
        return Ok(Box::new(CsvAdapter::from_config(config)?));
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        Ok(Box::new(SqliteAdapter::from_config(config)?))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(ScreenerError::ConfigMissing {
            section: "csv".into(),
            key: "path".into(),
        })
    }
}

pub fn build_thresholds(config: &dyn ConfigPort) -> Result<Thresholds, ScreenerError> {
    validate_thresholds(config)?;
    let defaults = Thresholds::default();
    let number = |key: &str, default: f64| -> Result<f64, ScreenerError> {
        Ok(read_number(config, "thresholds", key)?.unwrap_or(default))
    };
    Ok(Thresholds {
        min_value: number("min_value", defaults.min_value)?,
        max_runup: number("max_runup", defaults.max_runup)?,
        min_close: number("min_close", defaults.min_close)?,
        shell_marker: config
            .get_string("thresholds", "shell_marker")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.shell_marker),
        common_suffix: config
            .get_string("thresholds", "common_suffix")
            .and_then(|s| s.trim().chars().next())
            .unwrap_or(defaults.common_suffix),
        min_market_cap: number("min_market_cap", defaults.min_market_cap)?,
        min_operating_income: number("min_operating_income", defaults.min_operating_income)?,
    })
}

/// Chain text in effect: the override, else `[screen] filters`, else empty.
pub fn filter_text(config: &dyn ConfigPort, overrides: &ScreenOverrides) -> String {
    overrides
        .filters
        .clone()
        .or_else(|| config.get_string("screen", "filters"))
        .unwrap_or_default()
}

pub fn build_screen_request(
    config: &dyn ConfigPort,
    overrides: &ScreenOverrides,
) -> Result<ScreenRequest, ScreenerError> {
    let thresholds = build_thresholds(config)?;
    let filters = filter_parser::parse(&filter_text(config, overrides), &thresholds)?;

    let start = match overrides.start {
        Some(d) => Some(d),
        None => config.get_date("screen", "start_date")?,
    };
    let end = match overrides.end {
        Some(d) => Some(d),
        None => config.get_date("screen", "end_date")?,
    };

    let window_days =
        read_count(config, "screen", "window_days")?.unwrap_or(DEFAULT_WINDOW_DAYS as i64);
    if window_days < 1 {
        return Err(ScreenerError::ConfigInvalid {
            section: "screen".into(),
            key: "window_days".into(),
            reason: "window_days must be at least 1".into(),
        });
    }

    Ok(ScreenRequest {
        start,
        end,
        window_days: window_days as usize,
        filters,
        exclude_spc: overrides
            .exclude_spc
            .unwrap_or_else(|| config.get_bool("screen", "exclude_spc", false)),
        thresholds,
    })
}

fn start_logging(config: &dyn ConfigPort) {
    init_logging(config.get_string("logging", "level").as_deref());
}

fn run_screen(
    config_path: &Path,
    overrides: &ScreenOverrides,
    json: bool,
    output: Option<&Path>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    start_logging(&config);
    tracing::info!(config = %config_path.display(), "starting screen");

    let text = filter_text(&config, overrides);
    let request = match build_screen_request(&config, overrides) {
        Ok(r) => r,
        Err(e) => return report_error(&e, Some(&text)),
    };
    let source = match open_source(&config) {
        Ok(s) => s,
        Err(e) => return report_error(&e, None),
    };
    let report = match screen::run_screen(source.as_ref(), &request) {
        Ok(r) => r,
        Err(e) => return report_error(&e, None),
    };

    let writer: Box<dyn ReportPort> = if json {
        Box::new(JsonReport { pretty: true })
    } else {
        Box::new(TextReport)
    };
    let result = match output {
        Some(path) => File::create(path)
            .map_err(ScreenerError::from)
            .and_then(|mut file| writer.write(&report, &mut file)),
        None => writer.write(&report, &mut io::stdout().lock()),
    };
    if let Err(e) = result {
        return report_error(&e, None);
    }
    if let Some(path) = output {
        eprintln!("Report written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    start_logging(&config);

    let range = open_source(&config).and_then(|source| source.data_range());
    match range {
        Ok(Some(r)) => {
            println!("First day:     {}", r.first);
            println!("Last day:      {}", r.last);
            println!("Trading days:  {}", r.trading_days);
            println!("Tickers:       {}", r.tickers);
            println!("Rows:          {}", r.rows);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("No data found");
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e, None),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let text = config.get_string("screen", "filters").unwrap_or_default();
    if let Err(e) = validate_screen_config(&config) {
        return report_error(&e, Some(&text));
    }
    let request = match build_screen_request(&config, &ScreenOverrides::default()) {
        Ok(r) => r,
        Err(e) => return report_error(&e, Some(&text)),
    };

    eprintln!("\nFilter chain:");
    if request.filters.is_empty() {
        eprintln!("  (none, every ticker on the reference day passes)");
    }
    for spec in &request.filters {
        eprintln!("  {:<3} {:<16} {}", spec.logic, spec.name(), spec.label);
    }
    eprintln!("\nSummary: {}", screen::describe(&request));
    eprintln!("\nConfig validated successfully");
    ExitCode::SUCCESS
}

fn run_days(config_path: &Path, end: Option<NaiveDate>, count: usize) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    start_logging(&config);

    let days = open_source(&config)
        .and_then(|source| source.trading_days())
        .and_then(TradingCalendar::new)
        .map(|calendar| {
            let end = end.unwrap_or_else(|| calendar.last());
            calendar.recent_trading_days(end, count)
        });
    match days {
        Ok(days) => {
            let mut out = io::stdout().lock();
            for day in days {
                if writeln!(out, "{day}").is_err() {
                    break;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e, None),
    }
}
