//! Plain-text report for the terminal.
//!
//! Sections, in order: query header, per-condition counts, and the ranked
//! result table.

use crate::domain::error::ScreenerError;
use crate::domain::screen::{ResultRow, ScreenReport};
use crate::ports::report_port::ReportPort;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl ReportPort for TextReport {
    fn write(&self, report: &ScreenReport, out: &mut dyn Write) -> Result<(), ScreenerError> {
        out.write_all(render(report).as_bytes())?;
        Ok(())
    }
}

pub fn render(report: &ScreenReport) -> String {
    let mut output = String::new();
    output.push_str(&render_header(report));
    output.push_str(&render_counts(report));
    output.push_str(&render_rows(&report.rows));
    output
}

fn render_header(report: &ScreenReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("Period:     {} ~ {}\n", report.start, report.end));
    let days: Vec<String> = report
        .resolved_days
        .iter()
        .map(|d| format!("D-{} {}", d.offset, d.date))
        .collect();
    output.push_str(&format!("Reference:  {}\n", days.join(", ")));
    output.push_str(&format!("Conditions: {}\n", report.summary));
    output
}

fn render_counts(report: &ScreenReport) -> String {
    if report.counts.is_empty() {
        return String::new();
    }
    let mut output = String::from("\nMatches per condition:\n");
    for c in &report.counts {
        output.push_str(&format!("  [{}] {}\n", c.label, c.count));
    }
    output
}

fn render_rows(rows: &[ResultRow]) -> String {
    let mut output = format!("\nRecommended: {}\n", rows.len());
    if rows.is_empty() {
        return output;
    }
    // the column only appears when the source carries operating income
    let with_income = rows.iter().any(|r| r.bar.operating_income.is_some());

    output.push_str(&format!(
        "{:>4}  {:<8} {:<20} {:>10} {:>10} {:>10} {:>10} {:>8} {:>14} {:>18} {:>20}",
        "#", "ticker", "name", "open", "high", "low", "close", "chg%", "volume", "value", "market cap"
    ));
    if with_income {
        output.push_str(&format!(" {:>18}", "op. income"));
    }
    output.push('\n');

    for row in rows {
        let bar = &row.bar;
        let change = bar
            .change_rate()
            .map(|r| format!("{r:+.2}"))
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{:>4}  {:<8} {:<20} {:>10} {:>10} {:>10} {:>10} {:>8} {:>14} {:>18} {:>20}",
            row.rank,
            bar.ticker,
            bar.name,
            format_amount(bar.open),
            format_amount(bar.high),
            format_amount(bar.low),
            format_amount(bar.close),
            change,
            format_amount(bar.volume as f64),
            format_amount(bar.value),
            optional_amount(bar.market_cap)
        ));
        if with_income {
            output.push_str(&format!(" {:>18}", optional_amount(bar.operating_income)));
        }
        output.push('\n');
    }
    output
}

fn optional_amount(amount: Option<f64>) -> String {
    amount.map(format_amount).unwrap_or_else(|| "-".to_string())
}

/// Whole-number amount with thousands separators.
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
