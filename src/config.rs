//! Configuration for the conformance engine
//!
//! Configuration is an explicit, immutable object constructed once at
//! run start and passed by reference into every rule. Documents are
//! schema-validated at load: unknown fields, bad regexes, and bad
//! globs are fatal before any file is touched.

use crate::finding::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error. Always fatal: ambiguous config is worse than
/// no config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown config file format: {0}")]
    UnknownFormat(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob '{glob}': {source}")]
    Glob {
        glob: String,
        #[source]
        source: globset::Error,
    },
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Enable parallel per-file processing
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// File scope settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// Include patterns
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec![
                "**/*.tsx".to_string(),
                "**/*.jsx".to_string(),
                "**/*.ts".to_string(),
                "**/*.js".to_string(),
            ],
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/dist/**".to_string(),
                "**/build/**".to_string(),
                "**/coverage/**".to_string(),
                "**/*.d.ts".to_string(),
            ],
        }
    }
}

/// Allow-list document mapping element kinds to attribute name sets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllowListConfig {
    /// Attributes permitted on every native element kind
    pub common: BTreeSet<String>,

    /// Tags whose kind is derived from an attribute value
    /// (tag name -> discriminating attribute, e.g. `input: type`)
    pub kinded_tags: BTreeMap<String, String>,

    /// Discriminating value assumed when the attribute is absent
    pub default_type: String,

    /// Per-kind attribute allow-sets; the effective set is the union
    /// with `common`
    pub kinds: BTreeMap<String, BTreeSet<String>>,

    /// Severity of attribute-removal findings
    pub removal_severity: Severity,
}

impl Default for AllowListConfig {
    fn default() -> Self {
        let common: BTreeSet<String> = [
            "id",
            "className",
            "style",
            "name",
            "title",
            "role",
            "tabIndex",
            "onChange",
            "onClick",
            "onBlur",
            "onFocus",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut kinds = BTreeMap::new();
        for (kind, attrs) in [
            ("text-input", vec!["type", "value", "placeholder", "maxLength", "readOnly", "required"]),
            ("date-input", vec!["type", "value", "min", "max", "step"]),
            ("number-input", vec!["type", "value", "min", "max", "step"]),
            ("checkbox-input", vec!["type", "checked", "value"]),
        ] {
            kinds.insert(
                kind.to_string(),
                attrs.into_iter().map(String::from).collect(),
            );
        }

        let mut kinded_tags = BTreeMap::new();
        kinded_tags.insert("input".to_string(), "type".to_string());

        Self {
            common,
            kinded_tags,
            default_type: "text".to_string(),
            kinds,
            removal_severity: Severity::Warning,
        }
    }
}

impl AllowListConfig {
    /// Infer the element kind for a tag.
    ///
    /// Kinded tags combine the discriminating attribute value with the
    /// tag name (`date` + `input` -> `date-input`); every other tag is
    /// its own kind.
    pub fn kind_of(&self, tag: &str, type_value: Option<&str>) -> String {
        match self.kinded_tags.get(tag) {
            Some(_) => format!("{}-{}", type_value.unwrap_or(&self.default_type), tag),
            None => tag.to_string(),
        }
    }

    /// Name of the discriminating attribute for a tag, if any
    pub fn discriminant(&self, tag: &str) -> Option<&str> {
        self.kinded_tags.get(tag).map(|s| s.as_str())
    }

    /// Whether an attribute is allowed for the given kind
    pub fn allows(&self, kind: &str, attribute: &str) -> bool {
        if self.common.contains(attribute) {
            return true;
        }
        self.kinds
            .get(kind)
            .map(|set| set.contains(attribute))
            .unwrap_or(false)
    }
}

/// A package whose self-referential imports are normalized
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Public package name (e.g. `@scope/pkg`)
    pub name: String,

    /// Source root the public API maps onto, relative to the scan root
    pub root: PathBuf,
}

/// One rewrite-map entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    /// Regex the specifier must match
    pub pattern: String,

    /// Replacement template (`$1`-style captures)
    pub replacement: String,
}

/// Import-rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportsConfig {
    /// Packages subject to self-import normalization
    pub packages: Vec<PackageConfig>,

    /// Ordered deny patterns (regexes over specifiers)
    pub deny: Vec<String>,

    /// Ordered rewrite map consulted on a deny match
    pub rewrites: Vec<RewriteConfig>,
}

/// Deny/rewrite patterns compiled once at run start
#[derive(Debug, Clone)]
pub struct CompiledImports {
    pub deny: Vec<(String, Regex)>,
    pub rewrites: Vec<(Regex, String)>,
}

impl ImportsConfig {
    /// Compile deny patterns and rewrite regexes, failing fast on any
    /// invalid pattern.
    pub fn compile(&self) -> Result<CompiledImports, ConfigError> {
        let mut deny = Vec::with_capacity(self.deny.len());
        for pattern in &self.deny {
            let re = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            deny.push((pattern.clone(), re));
        }

        let mut rewrites = Vec::with_capacity(self.rewrites.len());
        for rw in &self.rewrites {
            let re = Regex::new(&rw.pattern).map_err(|source| ConfigError::Pattern {
                pattern: rw.pattern.clone(),
                source,
            })?;
            rewrites.push((re, rw.replacement.clone()));
        }

        Ok(CompiledImports { deny, rewrites })
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Engine settings
    pub engine: EngineConfig,

    /// File scope settings
    pub files: FilesConfig,

    /// Attribute allow-list document
    pub allowlist: AllowListConfig,

    /// Import deny/rewrite document
    pub imports: ImportsConfig,

    /// Severity overrides (rule name -> severity)
    pub severity: HashMap<String, Severity>,

    /// Prepend a provenance annotation to rewritten files
    pub provenance: bool,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file and validate it
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => return Err(ConfigError::UnknownFormat(ext.to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration shape beyond what serde enforces.
    ///
    /// Compiles every pattern so a malformed document aborts before
    /// any file is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.imports.compile()?;

        for pkg in &self.imports.packages {
            if pkg.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "imports.packages entry with empty name".to_string(),
                ));
            }
            if pkg.root.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "imports.packages entry '{}' has empty root",
                    pkg.name
                )));
            }
        }

        for pattern in self.files.include.iter().chain(&self.files.exclude) {
            globset::Glob::new(pattern).map_err(|source| ConfigError::Glob {
                glob: pattern.clone(),
                source,
            })?;
        }

        if self.allowlist.default_type.is_empty() {
            return Err(ConfigError::Invalid(
                "allowlist.default_type must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get severity override for a rule
    pub fn severity_override(&self, rule_name: &str) -> Option<Severity> {
        self.severity.get(rule_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert!(config.engine.parallel);
        assert_eq!(config.engine.jobs, 0);
        assert!(!config.files.include.is_empty());
        assert!(!config.provenance);
    }

    #[test]
    fn test_kind_inference() {
        let allowlist = AllowListConfig::default();
        assert_eq!(allowlist.kind_of("input", Some("date")), "date-input");
        assert_eq!(allowlist.kind_of("input", None), "text-input");
        assert_eq!(allowlist.kind_of("button", None), "button");
        assert_eq!(allowlist.discriminant("input"), Some("type"));
        assert_eq!(allowlist.discriminant("div"), None);
    }

    #[test]
    fn test_allows_union_of_common_and_kind() {
        let allowlist = AllowListConfig::default();
        // Common attributes allowed on every kind
        assert!(allowlist.allows("date-input", "className"));
        assert!(allowlist.allows("unknown-kind", "className"));
        // Kind-specific
        assert!(allowlist.allows("date-input", "min"));
        assert!(!allowlist.allows("date-input", "placeholder"));
        assert!(!allowlist.allows("date-input", "foo"));
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
engine:
  parallel: false
  jobs: 4
imports:
  packages:
    - name: "@pkg/components"
      root: "pkg/src"
  deny:
    - "^lodash/"
  rewrites:
    - pattern: "^lodash/(.+)$"
      replacement: "lodash-es/$1"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.engine.parallel);
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.imports.packages[0].name, "@pkg/components");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let yaml = "enigne:\n  parallel: true\n";
        let result: Result<Config, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_deny_regex_is_config_error() {
        let config = Config {
            imports: ImportsConfig {
                deny: vec!["(unclosed".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { .. }));
    }

    #[test]
    fn test_empty_package_name_is_config_error() {
        let config = Config {
            imports: ImportsConfig {
                packages: vec![PackageConfig {
                    name: String::new(),
                    root: PathBuf::from("src"),
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let config = Config {
            files: FilesConfig {
                include: vec!["a{".to_string()],
                exclude: vec![],
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Glob { .. }
        ));
    }

    #[test]
    fn test_severity_override() {
        let mut config = Config::new();
        config
            .severity
            .insert("attribute-allowlist".to_string(), Severity::Error);
        assert_eq!(
            config.severity_override("attribute-allowlist"),
            Some(Severity::Error)
        );
        assert_eq!(config.severity_override("other"), None);
    }

    #[test]
    fn test_compile_imports() {
        let imports = ImportsConfig {
            packages: vec![],
            deny: vec!["^lodash/".to_string()],
            rewrites: vec![RewriteConfig {
                pattern: "^lodash/(.+)$".to_string(),
                replacement: "lodash-es/$1".to_string(),
            }],
        };
        let compiled = imports.compile().unwrap();
        assert_eq!(compiled.deny.len(), 1);
        assert!(compiled.deny[0].1.is_match("lodash/get"));
        assert_eq!(
            compiled.rewrites[0].0.replace("lodash/get", &compiled.rewrites[0].1),
            "lodash-es/get"
        );
    }
}
