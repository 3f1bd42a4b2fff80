//! JSON report via serde.

use crate::domain::error::ScreenerError;
use crate::domain::screen::ScreenReport;
use crate::ports::report_port::ReportPort;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport {
    pub pretty: bool,
}

impl ReportPort for JsonReport {
    fn write(&self, report: &ScreenReport, out: &mut dyn Write) -> Result<(), ScreenerError> {
        let result = if self.pretty {
            serde_json::to_writer_pretty(&mut *out, report)
        } else {
            serde_json::to_writer(&mut *out, report)
        };
        result.map_err(|e| ScreenerError::Io(e.into()))?;
        writeln!(out)?;
        Ok(())
    }
}
