//! Import rules: self-package path normalization and deny/rewrite
//! mapping

use crate::config::{CompiledImports, Config, ConfigError, PackageConfig};
use crate::finding::{Finding, RuleId, Severity};
use crate::parser::SourceUnit;
use crate::rules::{Rule, RuleError, RuleKind};
use crate::tree::SyntaxTree;
use std::path::{Component, Path};

const SELF_IMPORT_ID: RuleId = RuleId::new("self-import", "1");
const REWRITE_ID: RuleId = RuleId::new("import-rewrite", "1");

/// Rewrites a package's imports of its own public name into relative
/// paths.
///
/// A specifier `@pkg/sub/path` inside a file under `@pkg`'s source
/// root resolves to `root/sub/path`; the replacement is that target
/// relative to the importing file's directory, forward-slashed, with a
/// `./` prefix when not already relative. Relative specifiers never
/// name the package again, so the rule cannot re-trigger on its own
/// output.
pub struct SelfImportRule {
    packages: Vec<PackageConfig>,
    severity: Severity,
}

impl SelfImportRule {
    pub fn new(config: &Config) -> Self {
        Self {
            packages: config.imports.packages.clone(),
            severity: config
                .severity_override(SELF_IMPORT_ID.name)
                .unwrap_or(Severity::Info),
        }
    }

    /// Match a specifier against a package name, yielding the sub-path
    /// (empty for the bare package name).
    fn self_sub_path<'a>(specifier: &'a str, package: &PackageConfig) -> Option<&'a str> {
        if specifier == package.name {
            return Some("");
        }
        specifier
            .strip_prefix(&package.name)
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

impl Rule for SelfImportRule {
    fn id(&self) -> RuleId {
        SELF_IMPORT_ID
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Import
    }

    fn description(&self) -> &str {
        "rewrites self-referential package imports into relative paths"
    }

    fn apply(&self, unit: &SourceUnit, tree: &mut SyntaxTree) -> Result<Vec<Finding>, RuleError> {
        let Some(file_dir) = unit.path.parent() else {
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        let mut rewrites: Vec<(usize, String, String)> = Vec::new();

        for (ii, import) in tree.imports().iter().enumerate() {
            for package in &self.packages {
                let Some(sub_path) = Self::self_sub_path(&import.specifier, package) else {
                    continue;
                };
                // Only files under the package's own source root
                // re-import the public API.
                if !file_dir.starts_with(&package.root) {
                    continue;
                }
                let target = if sub_path.is_empty() {
                    package.root.clone()
                } else {
                    package.root.join(sub_path)
                };
                let relative = relative_specifier(file_dir, &target);
                if relative != import.specifier {
                    rewrites.push((ii, import.specifier.clone(), relative));
                }
                break;
            }
        }

        for (ii, old, new) in rewrites {
            let location = tree.imports()[ii].location(&unit.path);
            tree.set_import_specifier(ii, &new);
            findings.push(
                Finding::new(
                    self.id(),
                    self.severity,
                    location,
                    &format!("self-referential import '{}' rewritten to '{}'", old, new),
                )
                .fixed(),
            );
        }

        Ok(findings)
    }
}

/// Compute the relative module specifier from `from_dir` to `target`,
/// normalized to forward slashes with a leading relative marker.
fn relative_specifier(from_dir: &Path, target: &Path) -> String {
    let from: Vec<&str> = normal_components(from_dir);
    let to: Vec<&str> = normal_components(target);

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from.len() - common;
    let mut parts: Vec<&str> = Vec::with_capacity(ups + to.len() - common);
    for _ in 0..ups {
        parts.push("..");
    }
    parts.extend(&to[common..]);

    if parts.is_empty() {
        return ".".to_string();
    }
    let joined = parts.join("/");
    if joined.starts_with("../") || joined == ".." {
        joined
    } else {
        format!("./{}", joined)
    }
}

fn normal_components(path: &Path) -> Vec<&str> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect()
}

/// Tests specifiers against ordered deny patterns and applies the
/// configured rewrite map.
///
/// A deny match with no matching rewrite is an unfixable violation. A
/// rewrite whose output still matches a deny pattern is a pipeline
/// defect and aborts the file instead of looping.
pub struct ImportRewriteRule {
    compiled: CompiledImports,
    severity: Severity,
}

impl ImportRewriteRule {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            compiled: config.imports.compile()?,
            severity: config
                .severity_override(REWRITE_ID.name)
                .unwrap_or(Severity::Info),
        })
    }

    fn first_deny_match(&self, specifier: &str) -> Option<&str> {
        self.compiled
            .deny
            .iter()
            .find(|(_, re)| re.is_match(specifier))
            .map(|(pattern, _)| pattern.as_str())
    }
}

impl Rule for ImportRewriteRule {
    fn id(&self) -> RuleId {
        REWRITE_ID
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Import
    }

    fn description(&self) -> &str {
        "applies the deny/rewrite map to import specifiers"
    }

    fn apply(&self, unit: &SourceUnit, tree: &mut SyntaxTree) -> Result<Vec<Finding>, RuleError> {
        let mut findings = Vec::new();
        let mut rewrites: Vec<(usize, String, String)> = Vec::new();

        for (ii, import) in tree.imports().iter().enumerate() {
            let Some(deny_pattern) = self.first_deny_match(&import.specifier) else {
                continue;
            };

            let rewritten = self
                .compiled
                .rewrites
                .iter()
                .find(|(re, _)| re.is_match(&import.specifier))
                .map(|(re, replacement)| {
                    re.replace(&import.specifier, replacement.as_str()).into_owned()
                });

            match rewritten {
                Some(new_specifier) => {
                    if let Some(renewed) = self.first_deny_match(&new_specifier) {
                        return Err(RuleError::PipelineDefect {
                            specifier: new_specifier,
                            pattern: renewed.to_string(),
                        });
                    }
                    rewrites.push((ii, import.specifier.clone(), new_specifier));
                }
                None => {
                    findings.push(Finding::new(
                        self.id(),
                        Severity::Error,
                        import.location(&unit.path),
                        &format!(
                            "import '{}' is denied (pattern '{}'); unfixable, requires manual resolution",
                            import.specifier, deny_pattern
                        ),
                    ));
                }
            }
        }

        for (ii, old, new) in rewrites {
            let location = tree.imports()[ii].location(&unit.path);
            tree.set_import_specifier(ii, &new);
            findings.push(
                Finding::new(
                    self.id(),
                    self.severity,
                    location,
                    &format!("import '{}' rewritten to '{}'", old, new),
                )
                .fixed(),
            );
        }

        Ok(findings)
    }
}
