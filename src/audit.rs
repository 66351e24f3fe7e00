//! Architecture auditor
//!
//! Non-mutating checks over the whole file set rather than one file.
//! Each check is a pure reduction `(file set) -> AuditCheck` counting
//! pattern matches against a target of zero; there is no
//! fix-application phase.

use crate::finding::Location;
use crate::parser::{self, SourceUnit};
use crate::scope;
use serde::Serialize;
use std::path::{Path, PathBuf};

const STYLESHEET_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less"];
const SOURCE_EXTENSIONS: &[&str] = &["tsx", "jsx", "ts", "js"];

/// Relative specifiers climbing at least this many directory levels
/// indicate a file reaching outside its own package area.
const DEEP_IMPORT_LEVELS: usize = 3;

/// One global structural invariant, scored pass/fail
#[derive(Debug, Clone, Serialize)]
pub struct AuditCheck {
    /// Check name
    pub name: &'static str,
    /// What the check enforces
    pub description: &'static str,
    /// Permitted violation count (always 0)
    pub target: usize,
    /// Observed violation count
    pub actual: usize,
    /// Whether `actual <= target`
    pub passing: bool,
    /// Where each violation was observed
    pub violations: Vec<Location>,
}

impl AuditCheck {
    fn new(name: &'static str, description: &'static str, violations: Vec<Location>) -> Self {
        Self {
            name,
            description,
            target: 0,
            actual: violations.len(),
            passing: violations.is_empty(),
            violations,
        }
    }
}

/// The scored result of an audit pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub checks: Vec<AuditCheck>,
}

impl AuditReport {
    /// Fraction of checks passing, in `[0, 1]`
    pub fn score(&self) -> f64 {
        if self.checks.is_empty() {
            return 1.0;
        }
        let passing = self.checks.iter().filter(|c| c.passing).count();
        passing as f64 / self.checks.len() as f64
    }

    pub fn all_passing(&self) -> bool {
        self.checks.iter().all(|c| c.passing)
    }
}

/// Run every audit check over the tree rooted at `root`.
///
/// Walks the unfiltered listing (rule scope does not apply) so checks
/// can pair source files with their stylesheets.
pub fn run_audit(root: &Path) -> std::io::Result<AuditReport> {
    let files = scope::walk(root)?;
    Ok(AuditReport {
        checks: vec![
            colocated_stylesheet(&files),
            orphan_stylesheet(&files),
            deep_relative_import(&files),
        ],
    })
}

/// Every component file has a stylesheet next to it with the same stem
fn colocated_stylesheet(files: &[PathBuf]) -> AuditCheck {
    let violations = files
        .iter()
        .filter(|f| is_component_file(f))
        .filter(|f| !has_sibling(files, f, STYLESHEET_EXTENSIONS))
        .map(|f| Location::new(f.clone(), 1, 1))
        .collect();

    AuditCheck::new(
        "colocated-stylesheet",
        "every component file has a co-located stylesheet",
        violations,
    )
}

/// Every stylesheet belongs to a source file with the same stem
fn orphan_stylesheet(files: &[PathBuf]) -> AuditCheck {
    let violations = files
        .iter()
        .filter(|f| has_extension(f, STYLESHEET_EXTENSIONS))
        .filter(|f| !has_sibling(files, f, SOURCE_EXTENSIONS))
        .map(|f| Location::new(f.clone(), 1, 1))
        .collect();

    AuditCheck::new(
        "orphan-stylesheet",
        "every stylesheet is co-located with a source file of the same name",
        violations,
    )
}

/// No import climbs three or more directories
fn deep_relative_import(files: &[PathBuf]) -> AuditCheck {
    let mut violations = Vec::new();

    for file in files.iter().filter(|f| has_extension(f, SOURCE_EXTENSIONS)) {
        let Ok(unit) = SourceUnit::read(file) else {
            continue;
        };
        // Unparseable files are reported by the pipeline, not here
        let Ok(tree) = parser::parse(&unit) else {
            continue;
        };
        for import in tree.imports() {
            if climb_count(&import.specifier) >= DEEP_IMPORT_LEVELS {
                violations.push(Location::new(file.clone(), import.line, import.column));
            }
        }
    }

    AuditCheck::new(
        "deep-relative-import",
        "no import specifier climbs three or more directory levels",
        violations,
    )
}

/// Number of leading `..` segments in a specifier
fn climb_count(specifier: &str) -> usize {
    specifier.split('/').take_while(|seg| *seg == "..").count()
}

/// Markup file named like a component (upper-case stem, no extra
/// dotted suffix such as `.test` or `.stories`)
fn is_component_file(path: &Path) -> bool {
    if !has_extension(path, &["tsx", "jsx"]) {
        return false;
    }
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => {
            stem.chars().next().is_some_and(|c| c.is_ascii_uppercase()) && !stem.contains('.')
        }
        None => false,
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e))
        .unwrap_or(false)
}

/// Whether a file with the same parent and stem exists under one of
/// the given extensions.
fn has_sibling(files: &[PathBuf], path: &Path, extensions: &[&str]) -> bool {
    let Some(stem) = path.file_stem() else {
        return false;
    };
    extensions.iter().any(|ext| {
        let sibling = path.with_file_name(format!("{}.{}", stem.to_string_lossy(), ext));
        files.contains(&sibling)
    })
}
