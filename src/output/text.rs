//! Human-readable text output formatter

use super::ReportFormatter;
use crate::finding::{Finding, Severity};
use crate::report::RunReport;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show audit check results
    pub show_audit: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_audit: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Info => s.blue(),
        }
    }
}

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();

        // Findings are pre-sorted by file, so runs of equal paths form
        // the per-file groups.
        let mut current_file = None;
        for finding in &report.findings {
            if current_file != Some(&finding.location.file) {
                if current_file.is_some() {
                    output.push('\n');
                }
                let header = finding.location.file.display().to_string();
                if self.colored {
                    output.push_str(&format!("{}\n", header.underline()));
                } else {
                    output.push_str(&format!("{}\n", header));
                }
                current_file = Some(&finding.location.file);
            }
            output.push_str(&self.format_finding(finding));
            output.push('\n');
        }
        if current_file.is_some() {
            output.push('\n');
        }

        for diag in &report.diagnostics {
            let line = format!("{}: {}: {}", diag.file.display(), diag.kind, diag.message);
            if self.colored {
                output.push_str(&format!("{}\n", line.red()));
            } else {
                output.push_str(&format!("{}\n", line));
            }
        }

        if self.show_audit {
            if let Some(audit) = &report.audit {
                output.push_str("\nAudit:\n");
                for check in &audit.checks {
                    let status = if check.passing { "pass" } else { "fail" };
                    let status = if !self.colored {
                        status.normal()
                    } else if check.passing {
                        status.green()
                    } else {
                        status.red().bold()
                    };
                    output.push_str(&format!(
                        "  {} {} ({} violation{}, target {})\n",
                        status,
                        check.name,
                        check.actual,
                        if check.actual == 1 { "" } else { "s" },
                        check.target
                    ));
                    for violation in &check.violations {
                        output.push_str(&format!("      {}\n", violation.file.display()));
                    }
                }
                output.push_str(&format!("  score: {:.0}%\n", audit.score() * 100.0));
            }
        }

        if self.show_stats {
            output.push_str(&format!(
                "\n{} {} scanned, {} changed",
                report.files_scanned,
                if report.files_scanned == 1 {
                    "file"
                } else {
                    "files"
                },
                report.files_changed
            ));

            let mut counts = Vec::new();
            if report.counts.error > 0 {
                let s = format!(
                    "{} {}",
                    report.counts.error,
                    if report.counts.error == 1 {
                        "error"
                    } else {
                        "errors"
                    }
                );
                counts.push(if self.colored { s.red().to_string() } else { s });
            }
            if report.counts.warning > 0 {
                let s = format!(
                    "{} {}",
                    report.counts.warning,
                    if report.counts.warning == 1 {
                        "warning"
                    } else {
                        "warnings"
                    }
                );
                counts.push(if self.colored {
                    s.yellow().to_string()
                } else {
                    s
                });
            }
            if report.counts.info > 0 {
                let s = format!(
                    "{} {}",
                    report.counts.info,
                    if report.counts.info == 1 { "info" } else { "infos" }
                );
                counts.push(if self.colored {
                    s.blue().to_string()
                } else {
                    s
                });
            }

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                report.duration_ms as f64 / 1000.0
            ));
        }

        output
    }

    fn format_finding(&self, finding: &Finding) -> String {
        let rule = finding.rule.to_string();
        format!(
            "  {}:{}: {}[{}]: {}{}",
            finding.location.line,
            finding.location.column,
            self.severity_str(finding.severity),
            if self.colored {
                rule.cyan().to_string()
            } else {
                rule
            },
            finding.message,
            if finding.fix_applied { " (fixed)" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Location, RuleId};
    use crate::pipeline::{FileOutcome, RunMode};
    use crate::report::RunReport;
    use std::path::PathBuf;
    use std::time::Duration;

    fn report_with(findings: Vec<Finding>) -> RunReport {
        let outcome = FileOutcome {
            path: PathBuf::from("test.tsx"),
            changed: false,
            findings,
            new_text: None,
            diagnostics: Vec::new(),
        };
        RunReport::assemble(vec![outcome], None, RunMode::DryRun, Duration::from_millis(120))
    }

    #[test]
    fn test_format_finding() {
        let formatter = TextFormatter::new().without_color();
        let finding = Finding::new(
            RuleId::new("attribute-allowlist", "1"),
            Severity::Warning,
            Location::new(PathBuf::from("test.tsx"), 10, 5),
            "attribute 'foo' is not allowed",
        )
        .fixed();

        let output = formatter.format_finding(&finding);
        assert!(output.contains("10:5"));
        assert!(output.contains("warning"));
        assert!(output.contains("attribute-allowlist@1"));
        assert!(output.contains("(fixed)"));
    }

    #[test]
    fn test_format_report() {
        let formatter = TextFormatter::new().without_color();
        let report = report_with(vec![Finding::new(
            RuleId::new("r", "1"),
            Severity::Error,
            Location::new(PathBuf::from("test.tsx"), 1, 1),
            "bad import",
        )]);

        let output = formatter.format(&report);
        assert!(output.contains("test.tsx"));
        assert!(output.contains("1 file scanned, 0 changed"));
        assert!(output.contains("1 error"));
        assert!(output.contains("Finished in 0.12s"));
    }
}
