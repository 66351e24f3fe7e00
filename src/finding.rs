//! Finding and diagnostic types for conformance results

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Source code location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}

/// Identity of the rule that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RuleId {
    /// Rule name (e.g., "attribute-allowlist")
    pub name: &'static str,
    /// Rule version
    pub version: &'static str,
}

impl RuleId {
    pub const fn new(name: &'static str, version: &'static str) -> Self {
        Self { name, version }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A reported observation produced by a rule.
///
/// Immutable after emission; `fix_applied` records whether the rule
/// rewrote the offending syntax or left it for manual resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Rule that produced this finding
    pub rule: RuleId,
    /// Severity level
    pub severity: Severity,
    /// Source location
    pub location: Location,
    /// Human-readable message
    pub message: String,
    /// Whether a fix was applied to the tree
    pub fix_applied: bool,
}

impl Finding {
    /// Create a new finding
    pub fn new(rule: RuleId, severity: Severity, location: Location, message: &str) -> Self {
        Self {
            rule,
            severity,
            location,
            message: message.to_string(),
            fix_applied: false,
        }
    }

    /// Mark the finding as fixed
    pub fn fixed(mut self) -> Self {
        self.fix_applied = true;
        self
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Check if this is an outstanding (unfixed) violation
    pub fn is_outstanding(&self) -> bool {
        !self.fix_applied
    }
}

/// Category of a run-level diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// File could not be read; excluded from the run
    Read,
    /// File could not be parsed; excluded from rule processing
    Parse,
    /// Fixed file could not be persisted; left in its pre-run state
    Write,
    /// A rewrite re-triggered its own deny pattern; file aborted
    PipelineDefect,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Read => write!(f, "read-error"),
            DiagnosticKind::Parse => write!(f, "parse-error"),
            DiagnosticKind::Write => write!(f, "write-error"),
            DiagnosticKind::PipelineDefect => write!(f, "pipeline-defect"),
        }
    }
}

/// A run-level diagnostic.
///
/// Diagnostics are not violations: they record files the engine could
/// not process rather than conventions the files break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiagnostic {
    /// Diagnostic category
    pub kind: DiagnosticKind,
    /// Affected file
    pub file: PathBuf,
    /// Human-readable message
    pub message: String,
}

impl RunDiagnostic {
    pub fn new(kind: DiagnosticKind, file: PathBuf, message: &str) -> Self {
        Self {
            kind,
            file,
            message: message.to_string(),
        }
    }
}
