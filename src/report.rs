//! Run report aggregation
//!
//! Merges per-file outcomes and audit results into one run summary
//! with severity counts and the exit-status decision. Findings are
//! sorted into a stable order so two runs over unchanged input produce
//! byte-identical reports.

use crate::audit::AuditReport;
use crate::finding::{Finding, RunDiagnostic, Severity};
use crate::pipeline::{FileOutcome, RunMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Counts of findings by severity
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warning: usize,
    pub error: usize,
}

impl SeverityCounts {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.error
    }
}

/// The complete result of one run, consumable as structured output
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// When the run completed
    pub timestamp: DateTime<Utc>,
    /// Invocation mode the run used
    pub mode: RunMode,
    /// Files the scope resolver selected
    pub files_scanned: usize,
    /// Files whose text changed (or would change, in dry-run)
    pub files_changed: usize,
    /// All findings, sorted by file, line, column, then rule name
    pub findings: Vec<Finding>,
    /// Severity counts over `findings`
    pub counts: SeverityCounts,
    /// Audit checks, when an audit ran
    pub audit: Option<AuditReport>,
    /// Files the engine could not process
    pub diagnostics: Vec<RunDiagnostic>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u128,
}

impl RunReport {
    /// Assemble the report from per-file outcomes.
    ///
    /// Outcome order does not matter; sorting here is what makes
    /// parallel runs deterministic.
    pub fn assemble(
        outcomes: Vec<FileOutcome>,
        audit: Option<AuditReport>,
        mode: RunMode,
        duration: Duration,
    ) -> Self {
        let files_scanned = outcomes.len();
        let mut files_changed = 0;
        let mut findings = Vec::new();
        let mut diagnostics = Vec::new();

        for outcome in outcomes {
            if outcome.changed {
                files_changed += 1;
            }
            findings.extend(outcome.findings);
            diagnostics.extend(outcome.diagnostics);
        }

        findings.sort_by(|a, b| {
            (&a.location.file, a.location.line, a.location.column, a.rule.name).cmp(&(
                &b.location.file,
                b.location.line,
                b.location.column,
                b.rule.name,
            ))
        });
        diagnostics.sort_by(|a, b| a.file.cmp(&b.file));

        let mut counts = SeverityCounts::default();
        for finding in &findings {
            counts.record(finding.severity);
        }

        Self {
            timestamp: Utc::now(),
            mode,
            files_scanned,
            files_changed,
            findings,
            counts,
            audit,
            diagnostics,
            duration_ms: duration.as_millis(),
        }
    }

    /// Findings not resolved by a fix
    pub fn outstanding(&self) -> usize {
        self.findings.iter().filter(|f| f.is_outstanding()).count()
    }

    /// Exit-status decision.
    ///
    /// `0` only when the scanned tree conforms: a dry run found no
    /// violation at all (nothing was persisted, so any finding means
    /// the files on disk still violate conventions), or an apply run
    /// left zero unfixed violations. `1` when outstanding work or
    /// failing audit checks remain. `2` when the run itself was
    /// degraded (unreadable, unparseable, or unwritable files).
    pub fn exit_code(&self) -> i32 {
        if !self.diagnostics.is_empty() {
            return 2;
        }
        let outstanding = match self.mode {
            RunMode::DryRun => !self.findings.is_empty(),
            RunMode::Apply => self.outstanding() > 0,
        };
        let audit_failing = self.audit.as_ref().is_some_and(|a| !a.all_passing());
        if outstanding || audit_failing {
            return 1;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditReport;
    use crate::finding::{DiagnosticKind, Location, RuleId};
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};

    fn outcome(path: &str) -> FileOutcome {
        FileOutcome {
            path: PathBuf::from(path),
            changed: false,
            findings: Vec::new(),
            new_text: None,
            diagnostics: Vec::new(),
        }
    }

    fn finding(file: &str, line: usize, severity: Severity, fixed: bool) -> Finding {
        let f = Finding::new(
            RuleId::new("r", "1"),
            severity,
            Location::new(PathBuf::from(file), line, 1),
            "m",
        );
        if fixed {
            f.fixed()
        } else {
            f
        }
    }

    #[test]
    fn test_counts_and_sorting() {
        let mut a = outcome("b.tsx");
        a.findings.push(finding("b.tsx", 3, Severity::Warning, true));
        a.findings.push(finding("b.tsx", 1, Severity::Error, false));
        let mut b = outcome("a.tsx");
        b.changed = true;
        b.findings.push(finding("a.tsx", 9, Severity::Info, true));

        let report = RunReport::assemble(vec![a, b], None, RunMode::DryRun, Duration::from_millis(12));
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_changed, 1);
        assert_eq!(report.counts.info, 1);
        assert_eq!(report.counts.warning, 1);
        assert_eq!(report.counts.error, 1);
        assert_eq!(report.counts.total(), 3);

        let order: Vec<(&Path, usize)> = report
            .findings
            .iter()
            .map(|f| (f.location.file.as_path(), f.location.line))
            .collect();
        assert_eq!(
            order,
            vec![
                (Path::new("a.tsx"), 9),
                (Path::new("b.tsx"), 1),
                (Path::new("b.tsx"), 3)
            ]
        );
    }

    #[test]
    fn test_exit_code_clean_after_apply() {
        let mut a = outcome("a.tsx");
        a.changed = true;
        a.findings.push(finding("a.tsx", 1, Severity::Warning, true));
        let report = RunReport::assemble(vec![a], None, RunMode::Apply, Duration::ZERO);
        assert_eq!(report.outstanding(), 0);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_clean_dry_run() {
        let report =
            RunReport::assemble(vec![outcome("a.tsx")], None, RunMode::DryRun, Duration::ZERO);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_dry_run_with_fixable_findings_is_nonzero() {
        // Nothing is persisted in a dry run, so even an
        // all-fixable report means the files on disk still violate
        // conventions.
        let mut a = outcome("a.tsx");
        a.changed = true;
        a.findings.push(finding("a.tsx", 1, Severity::Warning, true));
        let report = RunReport::assemble(vec![a], None, RunMode::DryRun, Duration::ZERO);
        assert_eq!(report.outstanding(), 0);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_outstanding_violation() {
        for mode in [RunMode::DryRun, RunMode::Apply] {
            let mut a = outcome("a.tsx");
            a.findings.push(finding("a.tsx", 1, Severity::Error, false));
            let report = RunReport::assemble(vec![a], None, mode, Duration::ZERO);
            assert_eq!(report.exit_code(), 1);
        }
    }

    #[test]
    fn test_exit_code_degraded_run() {
        let mut a = outcome("a.tsx");
        a.diagnostics.push(RunDiagnostic::new(
            DiagnosticKind::Parse,
            PathBuf::from("a.tsx"),
            "bad",
        ));
        let report = RunReport::assemble(vec![a], None, RunMode::DryRun, Duration::ZERO);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_failing_audit() {
        let audit = AuditReport::default();
        let report = RunReport::assemble(vec![], Some(audit), RunMode::DryRun, Duration::ZERO);
        assert_eq!(report.exit_code(), 0);

        // A failing check flips the run to outstanding-work status
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/Badge.tsx"), "").unwrap();
        let audit = crate::audit::run_audit(dir.path()).unwrap();
        let report = RunReport::assemble(vec![], Some(audit), RunMode::DryRun, Duration::ZERO);
        assert_eq!(report.exit_code(), 1);
    }
}
