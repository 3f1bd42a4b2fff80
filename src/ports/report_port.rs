//! Report output port.

use crate::domain::error::ScreenerError;
use crate::domain::screen::ScreenReport;
use std::io::Write;

/// Renders a finished screen for the presentation side.
pub trait ReportPort {
    fn write(&self, report: &ScreenReport, out: &mut dyn Write) -> Result<(), ScreenerError>;
}
