//! Rule definition and registry
//!
//! A rule is the unit of conformance logic: a `(name, version)`
//! identity plus an `apply` step over one file's syntax tree. Rules
//! are stateless across files; everything they need is injected at
//! construction from the run configuration.

mod attributes;
mod imports;

pub use attributes::{AllowListRule, DuplicateAttributeRule};
pub use imports::{ImportRewriteRule, SelfImportRule};

use crate::config::{Config, ConfigError};
use crate::finding::{Finding, RuleId};
use crate::parser::SourceUnit;
use crate::tree::SyntaxTree;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rule category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Operates on markup structure (attributes, tags)
    Structural,
    /// Operates on import declarations
    Import,
    /// Whole-tree, non-mutating invariant scan
    Audit,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Structural => write!(f, "structural"),
            RuleKind::Import => write!(f, "import"),
            RuleKind::Audit => write!(f, "audit"),
        }
    }
}

/// Error during rule execution
#[derive(Debug, Error)]
pub enum RuleError {
    /// Internal rule failure; isolated to this (rule, file) pair
    #[error("{0}")]
    Execution(String),

    /// A rewrite re-triggered a deny pattern. This is an engine
    /// defect, not a normal finding: the file's processing is aborted
    /// rather than looped.
    #[error("rewritten specifier '{specifier}' still matches deny pattern '{pattern}'")]
    PipelineDefect { specifier: String, pattern: String },
}

/// A conformance rule applied to one file's syntax tree.
///
/// Implementations must be stateless across files: `apply` may mutate
/// the tree it is given but may not retain state between invocations.
pub trait Rule: Send + Sync {
    /// Rule identity
    fn id(&self) -> RuleId;

    /// Rule category
    fn kind(&self) -> RuleKind;

    /// One-line description for `--list-rules`
    fn description(&self) -> &str;

    /// Evaluate the rule, emitting findings and optionally mutating
    /// the tree.
    fn apply(&self, unit: &SourceUnit, tree: &mut SyntaxTree) -> Result<Vec<Finding>, RuleError>;
}

/// Construct the built-in rule set in declared pipeline order.
///
/// The order is authoritative: later rules see earlier rules' output.
pub fn default_rules(config: &Config) -> Result<Vec<Box<dyn Rule>>, ConfigError> {
    Ok(vec![
        Box::new(DuplicateAttributeRule::new(config)),
        Box::new(AllowListRule::new(config)),
        Box::new(SelfImportRule::new(config)),
        Box::new(ImportRewriteRule::new(config)?),
    ])
}
