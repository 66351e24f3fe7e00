//! Pipeline runner
//!
//! Folds the rule chain over one file at a time and maps that fold
//! over the whole scope in parallel. Per file the state machine is
//! `Parsed -> Rule_1 .. Rule_n -> Regenerated|Unchanged`; each rule
//! sees the tree regenerated from the previous rule's output. Rule and
//! file failures are isolated; only configuration errors abort a run.

use crate::config::{Config, ConfigError};
use crate::finding::{DiagnosticKind, Finding, Location, RuleId, RunDiagnostic, Severity};
use crate::parser::{self, SourceUnit};
use crate::rules::{default_rules, Rule, RuleError};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Per-file result of one pipeline pass
#[derive(Debug)]
pub struct FileOutcome {
    /// File path
    pub path: PathBuf,
    /// Whether the fold produced (and apply mode persisted) new text
    pub changed: bool,
    /// Findings emitted by the rules
    pub findings: Vec<Finding>,
    /// The regenerated text, when any fix was applied
    pub new_text: Option<String>,
    /// Run-level diagnostics for this file
    pub diagnostics: Vec<RunDiagnostic>,
}

impl FileOutcome {
    fn clean(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            changed: false,
            findings: Vec::new(),
            new_text: None,
            diagnostics: Vec::new(),
        }
    }

    fn diagnostic(path: &Path, kind: DiagnosticKind, message: &str) -> Self {
        let mut outcome = Self::clean(path);
        outcome
            .diagnostics
            .push(RunDiagnostic::new(kind, path.to_path_buf(), message));
        outcome
    }
}

/// Invocation mode: report only, or persist fixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Report findings, write nothing
    #[default]
    DryRun,
    /// Write fixed files back
    Apply,
}

/// The pipeline runner: orders rules and folds them over each file
pub struct Runner {
    config: Config,
    rules: Vec<Box<dyn Rule>>,
    mode: RunMode,
}

impl Runner {
    /// Build a runner, validating configuration and compiling every
    /// rule before any file is touched.
    ///
    /// `root` is the scan root. Package roots in the configuration are
    /// written relative to it; anchoring them here is what lets rules
    /// match the absolute paths the scope resolver produces.
    pub fn new(config: Config, mode: RunMode, root: &Path) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut config = config;
        for pkg in &mut config.imports.packages {
            if pkg.root.is_relative() {
                pkg.root = root.join(&pkg.root);
            }
        }
        let rules = default_rules(&config)?;
        Ok(Self {
            config,
            rules,
            mode,
        })
    }

    /// Build a runner over a caller-supplied rule chain
    pub fn with_rules(
        config: Config,
        mode: RunMode,
        rules: Vec<Box<dyn Rule>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rules,
            mode,
        })
    }

    /// The rule chain in pipeline order
    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Process the whole file set.
    ///
    /// Per-file computations share no mutable state, so the map runs
    /// on a rayon pool sized by config; results are merged afterwards
    /// by the report aggregator.
    pub fn run(&self, files: &[PathBuf]) -> Vec<FileOutcome> {
        if self.config.engine.parallel {
            let threads = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().unwrap());

            pool.install(|| files.par_iter().map(|f| self.process_path(f)).collect())
        } else {
            files.iter().map(|f| self.process_path(f)).collect()
        }
    }

    /// Read, fold, and (in apply mode) persist one file
    pub fn process_path(&self, path: &Path) -> FileOutcome {
        let unit = match SourceUnit::read(path) {
            Ok(u) => u,
            Err(e) => {
                return FileOutcome::diagnostic(
                    path,
                    DiagnosticKind::Read,
                    &format!("failed to read file: {}", e),
                );
            }
        };

        let mut outcome = self.process_unit(&unit);
        if self.mode == RunMode::Apply {
            self.persist(&mut outcome);
        }
        outcome
    }

    /// Fold the rule chain over one in-memory unit.
    ///
    /// Never touches the filesystem; dry-run and tests use this
    /// directly.
    pub fn process_unit(&self, unit: &SourceUnit) -> FileOutcome {
        let mut outcome = FileOutcome::clean(&unit.path);

        let mut tree = match parser::parse(unit) {
            Ok(t) => t,
            Err(e) => {
                log::debug!("{}: excluded from run: {}", unit.path.display(), e);
                return FileOutcome::diagnostic(
                    &unit.path,
                    DiagnosticKind::Parse,
                    &format!("{}", e),
                );
            }
        };

        let mut fixed_text: Option<String> = None;

        for rule in &self.rules {
            // A panicking rule is recovered as an execution error so
            // one bad (rule, file) pair never takes down the run.
            let step = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                rule.apply(unit, &mut tree)
            }))
            .unwrap_or_else(|payload| Err(RuleError::Execution(panic_message(payload))));

            match step {
                Ok(findings) => outcome.findings.extend(findings),
                Err(defect @ RuleError::PipelineDefect { .. }) => {
                    // The file's fold is aborted; any fixes from
                    // earlier rules are discarded so the file stays in
                    // its pre-run state.
                    outcome.findings.clear();
                    outcome.diagnostics.push(RunDiagnostic::new(
                        DiagnosticKind::PipelineDefect,
                        unit.path.clone(),
                        &format!("{}", defect),
                    ));
                    return outcome;
                }
                Err(e) => {
                    log::debug!(
                        "{}: rule {} failed: {}",
                        unit.path.display(),
                        rule.id(),
                        e
                    );
                    outcome.findings.push(Finding::new(
                        rule.id(),
                        Severity::Error,
                        Location::new(unit.path.clone(), 1, 1),
                        &format!("rule execution failed: {}", e),
                    ));
                    // Whatever the failing rule left half-done is
                    // discarded; the fold resumes from the last good
                    // text.
                    let current = fixed_text.clone().unwrap_or_else(|| unit.text.clone());
                    tree = match parser::parse_text(&current, &unit.path, unit.has_markup) {
                        Ok(t) => t,
                        Err(e) => {
                            outcome.findings.clear();
                            outcome.diagnostics.push(RunDiagnostic::new(
                                DiagnosticKind::Parse,
                                unit.path.clone(),
                                &format!("re-parse after rule failure failed: {}", e),
                            ));
                            return outcome;
                        }
                    };
                    continue;
                }
            }

            if tree.is_dirty() {
                let new_text = tree.regenerate();
                tree = match parser::parse_text(&new_text, &unit.path, unit.has_markup) {
                    Ok(t) => t,
                    Err(e) => {
                        // Regenerated output must stay parseable; if
                        // not, discard the file's fixes entirely.
                        outcome.findings.clear();
                        outcome.diagnostics.push(RunDiagnostic::new(
                            DiagnosticKind::Parse,
                            unit.path.clone(),
                            &format!("regenerated output failed to re-parse: {}", e),
                        ));
                        return outcome;
                    }
                };
                fixed_text = Some(new_text);
            }
        }

        outcome.changed = fixed_text.is_some();
        outcome.new_text = fixed_text;
        outcome
    }

    /// Write a changed file back, atomically.
    ///
    /// The new text lands in a sibling temp file renamed over the
    /// original, so an interrupted or failed write leaves the file in
    /// its pre-run state.
    fn persist(&self, outcome: &mut FileOutcome) {
        if !outcome.changed {
            return;
        }
        let Some(new_text) = outcome.new_text.take() else {
            return;
        };

        let contents = if self.config.provenance {
            with_provenance(&new_text, &fixing_rules(&outcome.findings))
        } else {
            new_text
        };

        if let Err(e) = write_atomic(&outcome.path, &contents) {
            log::warn!("{}: write failed: {}", outcome.path.display(), e);
            outcome.changed = false;
            outcome.diagnostics.push(RunDiagnostic::new(
                DiagnosticKind::Write,
                outcome.path.clone(),
                &format!("failed to persist fixes, file left untouched: {}", e),
            ));
            return;
        }
        outcome.new_text = Some(contents);
    }
}

/// Distinct rules that applied a fix, in emission order
fn fixing_rules(findings: &[Finding]) -> Vec<RuleId> {
    let mut rules: Vec<RuleId> = Vec::new();
    for finding in findings.iter().filter(|f| f.fix_applied) {
        if !rules.contains(&finding.rule) {
            rules.push(finding.rule);
        }
    }
    rules
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

const PROVENANCE_PREFIX: &str = "// conform: fixed by ";

/// Prepend or replace the single-line provenance annotation
fn with_provenance(text: &str, rules: &[RuleId]) -> String {
    let ids: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
    let line = format!("{}{}", PROVENANCE_PREFIX, ids.join(", "));

    match text.strip_prefix(PROVENANCE_PREFIX) {
        Some(rest) => {
            let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
            format!("{}\n{}", line, body)
        }
        None => format!("{}\n{}", line, text),
    }
}

fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let tmp = path.with_file_name(format!(".{}.conform-tmp", file_name));

    // Clean up the temp file on either failure; nothing may linger
    // next to the original.
    std::fs::write(&tmp, contents).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })?;
    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}
