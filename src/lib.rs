//! Conform - Source Conformance Engine
//!
//! Scans a UI-component source tree, applies ordered, versioned
//! conformance rules with automatic fixes, and produces a
//! deterministic report.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Scope -> [parse -> Runner(rules) per file] -> RunReport
//!                 \-> Auditor ------------------------------^
//! ```
//!
//! The scope resolver expands include/exclude globs into the file
//! set; the pipeline runner folds the rule chain over each file (in
//! parallel across files) and decides whether to persist fixes; the
//! architecture auditor scans the whole tree for global invariants;
//! the report aggregator merges everything into one summary with an
//! exit-status decision.
//!
//! Guarantees: re-running the pipeline on its own output produces no
//! further change (idempotence), two runs over unchanged input
//! produce byte-identical reports (determinism), and a failing rule
//! or malformed file never corrupts other files or the run (safety).

pub mod audit;
pub mod config;
pub mod finding;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod scope;
pub mod tree;

// Re-export main types
pub use audit::{run_audit, AuditCheck, AuditReport};
pub use config::{Config, ConfigError};
pub use finding::{DiagnosticKind, Finding, Location, RuleId, RunDiagnostic, Severity};
pub use output::{JsonFormatter, ReportFormatter, TextFormatter};
pub use parser::{ParseError, SourceUnit};
pub use pipeline::{FileOutcome, RunMode, Runner};
pub use report::RunReport;
pub use rules::{Rule, RuleError, RuleKind};
pub use scope::Scope;
pub use tree::SyntaxTree;
