//! Output formatters for run reports

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::finding::Finding;
use crate::report::RunReport;

/// Output formatter trait
pub trait ReportFormatter: Send + Sync {
    /// Format the entire run report
    fn format(&self, report: &RunReport) -> String;

    /// Format a single finding
    fn format_finding(&self, finding: &Finding) -> String;
}
