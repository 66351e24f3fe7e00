//! Scope resolution
//!
//! Expands include/exclude glob patterns into the concrete file set a
//! run operates over, skipping dependency and output directories.

use crate::config::{ConfigError, FilesConfig};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Directory names never descended into
const IGNORED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "coverage"];

/// The resolved include/exclude matcher for one run
#[derive(Debug)]
pub struct Scope {
    include: GlobSet,
    exclude: GlobSet,
}

impl Scope {
    /// Build a scope from config patterns, with an optional override
    /// pattern (`--scope`) replacing the include list.
    pub fn new(files: &FilesConfig, scope_override: Option<&str>) -> Result<Self, ConfigError> {
        let include_patterns: Vec<String> = match scope_override {
            Some(pattern) => vec![pattern.to_string()],
            None => files.include.clone(),
        };

        Ok(Self {
            include: build_globset(&include_patterns)?,
            exclude: build_globset(&files.exclude)?,
        })
    }

    /// Whether a path (relative to the scan root) is in scope
    pub fn matches(&self, path: &Path) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }

    /// Walk `root` and collect the in-scope file set, sorted for
    /// deterministic runs.
    pub fn resolve(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in walk(root)? {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            if self.matches(relative) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ConfigError::Glob {
            glob: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Glob {
        glob: patterns.join(","),
        source,
    })
}

/// Every file under `root`, minus ignored and hidden directories.
///
/// The architecture auditor uses this unfiltered listing so checks can
/// see files (stylesheets) outside the rule scope.
pub fn walk(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_into(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_dir() {
            if name.starts_with('.') || IGNORED_DIRS.contains(&name.as_ref()) {
                continue;
            }
            walk_into(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_scope_matching() {
        let files = FilesConfig::default();
        let scope = Scope::new(&files, None).unwrap();

        assert!(scope.matches(Path::new("pkg/src/DateInput.tsx")));
        assert!(scope.matches(Path::new("index.ts")));
        assert!(!scope.matches(Path::new("pkg/src/styles.css")));
        assert!(!scope.matches(Path::new("node_modules/x/index.js")));
        assert!(!scope.matches(Path::new("pkg/dist/index.js")));
        assert!(!scope.matches(Path::new("pkg/src/types.d.ts")));
    }

    #[test]
    fn test_scope_override_replaces_include() {
        let files = FilesConfig::default();
        let scope = Scope::new(&files, Some("pkg/src/fields/**/*.tsx")).unwrap();

        assert!(scope.matches(Path::new("pkg/src/fields/DateInput.tsx")));
        assert!(!scope.matches(Path::new("pkg/src/DateInput.tsx")));
        // Excludes still apply under an override
        let scope = Scope::new(&files, Some("**/*.js")).unwrap();
        assert!(!scope.matches(Path::new("node_modules/x/index.js")));
    }

    #[test]
    fn test_resolve_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("src/A.tsx"));
        touch(&root.join("src/B.ts"));
        touch(&root.join("node_modules/dep/index.ts"));
        touch(&root.join("dist/out.js"));
        touch(&root.join(".hidden/x.ts"));

        let scope = Scope::new(&FilesConfig::default(), None).unwrap();
        let files = scope.resolve(root).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["src/A.tsx", "src/B.ts"]);
    }

    #[test]
    fn test_walk_sees_stylesheets() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("src/A.tsx"));
        touch(&root.join("src/A.css"));

        let files = walk(root).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let files = FilesConfig::default();
        assert!(matches!(
            Scope::new(&files, Some("a{")),
            Err(ConfigError::Glob { .. })
        ));
    }
}
