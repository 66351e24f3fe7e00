//! JSON output formatter
//!
//! The report types already derive `Serialize`, so the machine-readable
//! shape is the data model itself: `{ timestamp, filesScanned,
//! filesChanged, findings, audit, diagnostics }`.

use super::ReportFormatter;
use crate::finding::Finding;
use crate::report::RunReport;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn serialize<T: serde::Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> String {
        self.serialize(report)
    }

    fn format_finding(&self, finding: &Finding) -> String {
        self.serialize(finding)
    }
}
