//! Structural rules over markup-element attributes

use crate::config::{AllowListConfig, Config};
use crate::finding::{Finding, RuleId, Severity};
use crate::parser::SourceUnit;
use crate::rules::{Rule, RuleError, RuleKind};
use crate::tree::SyntaxTree;
use std::collections::HashMap;

/// Universal prefixes that are always allowed, regardless of kind
const RESERVED_PREFIXES: &[&str] = &["data-", "aria-"];

const ALLOWLIST_ID: RuleId = RuleId::new("attribute-allowlist", "1");
const DUPLICATE_ID: RuleId = RuleId::new("duplicate-attribute", "1");

/// Removes attributes not present in the allow-set for an element's
/// kind.
///
/// Table-driven: the kind table and allow-sets come entirely from
/// configuration, so the rule generalizes to any native element/kind
/// pair in the scanned corpus. Removal is monotonic — the surviving
/// attributes are all members of the allow-set, so re-evaluation
/// triggers nothing.
pub struct AllowListRule {
    allowlist: AllowListConfig,
    severity: Severity,
}

impl AllowListRule {
    pub fn new(config: &Config) -> Self {
        Self {
            allowlist: config.allowlist.clone(),
            severity: config
                .severity_override(ALLOWLIST_ID.name)
                .unwrap_or(config.allowlist.removal_severity),
        }
    }

    fn keeps(&self, kind: &str, name: &str) -> bool {
        if RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
            return true;
        }
        self.allowlist.allows(kind, name)
    }
}

impl Rule for AllowListRule {
    fn id(&self) -> RuleId {
        ALLOWLIST_ID
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Structural
    }

    fn description(&self) -> &str {
        "removes attributes outside the allow-set for the element kind"
    }

    fn apply(&self, unit: &SourceUnit, tree: &mut SyntaxTree) -> Result<Vec<Finding>, RuleError> {
        let mut findings = Vec::new();
        let mut removals: Vec<(usize, usize, String, String, String)> = Vec::new();

        for (ei, element) in tree.elements().iter().enumerate() {
            if !element.native {
                continue;
            }
            let type_value = self
                .allowlist
                .discriminant(&element.tag)
                .and_then(|attr| element.attribute_value(attr));
            let kind = self.allowlist.kind_of(&element.tag, type_value);

            for (ai, attr) in element.attributes.iter().enumerate() {
                if attr.removed || attr.spread {
                    continue;
                }
                if !self.keeps(&kind, &attr.name) {
                    removals.push((
                        ei,
                        ai,
                        attr.name.clone(),
                        element.tag.clone(),
                        kind.clone(),
                    ));
                }
            }
        }

        for (ei, ai, name, tag, kind) in removals {
            let location = tree.elements()[ei].attributes[ai].location(&unit.path);
            tree.remove_attribute(ei, ai);
            findings.push(
                Finding::new(
                    self.id(),
                    self.severity,
                    location,
                    &format!(
                        "attribute '{}' is not allowed on <{}> (kind {}); removed",
                        name, tag, kind
                    ),
                )
                .fixed(),
            );
        }

        Ok(findings)
    }
}

/// Resolves duplicated attribute names within one opening tag.
///
/// Keeps only the last occurrence, matching last-write-wins runtime
/// semantics, and reports each dropped occurrence.
pub struct DuplicateAttributeRule {
    severity: Severity,
}

impl DuplicateAttributeRule {
    pub fn new(config: &Config) -> Self {
        Self {
            severity: config
                .severity_override(DUPLICATE_ID.name)
                .unwrap_or(Severity::Warning),
        }
    }
}

impl Rule for DuplicateAttributeRule {
    fn id(&self) -> RuleId {
        DUPLICATE_ID
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Structural
    }

    fn description(&self) -> &str {
        "keeps only the last occurrence of a repeated attribute"
    }

    fn apply(&self, unit: &SourceUnit, tree: &mut SyntaxTree) -> Result<Vec<Finding>, RuleError> {
        let mut findings = Vec::new();
        let mut removals: Vec<(usize, usize, String, String, usize)> = Vec::new();

        for (ei, element) in tree.elements().iter().enumerate() {
            let mut last_index: HashMap<&str, usize> = HashMap::new();
            for (ai, attr) in element.attributes.iter().enumerate() {
                if attr.removed || attr.spread {
                    continue;
                }
                last_index.insert(attr.name.as_str(), ai);
            }

            for (ai, attr) in element.attributes.iter().enumerate() {
                if attr.removed || attr.spread {
                    continue;
                }
                let last = last_index[attr.name.as_str()];
                if ai != last {
                    removals.push((
                        ei,
                        ai,
                        attr.name.clone(),
                        element.tag.clone(),
                        element.attributes[last].line,
                    ));
                }
            }
        }

        for (ei, ai, name, tag, kept_line) in removals {
            let location = tree.elements()[ei].attributes[ai].location(&unit.path);
            tree.remove_attribute(ei, ai);
            findings.push(
                Finding::new(
                    self.id(),
                    self.severity,
                    location,
                    &format!(
                        "duplicate attribute '{}' on <{}>; dropped in favor of the occurrence on line {}",
                        name, tag, kept_line
                    ),
                )
                .fixed(),
            );
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn unit(text: &str) -> SourceUnit {
        SourceUnit::from_text(Path::new("test.tsx"), text.to_string())
    }

    fn parse(unit: &SourceUnit) -> SyntaxTree {
        parser::parse(unit).unwrap()
    }

    #[test]
    fn test_allowlist_removes_unknown_attribute() {
        let config = Config::default();
        let rule = AllowListRule::new(&config);
        let u = unit(r#"<input type="date" foo="bar" aria-label="x" {...spread} />"#);
        let mut tree = parse(&u);

        let findings = rule.apply(&u, &mut tree).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].fix_applied);
        assert!(findings[0].message.contains("'foo'"));
        assert!(findings[0].message.contains("date-input"));

        let text = tree.regenerate();
        assert_eq!(text, r#"<input type="date" aria-label="x" {...spread} />"#);
    }

    #[test]
    fn test_allowlist_keeps_kind_specific_attributes() {
        let config = Config::default();
        let rule = AllowListRule::new(&config);
        let u = unit(r#"<input type="date" min="2020-01-01" max="2030-01-01" step="1" value="" />"#);
        let mut tree = parse(&u);

        let findings = rule.apply(&u, &mut tree).unwrap();
        assert!(findings.is_empty());
        assert!(!tree.is_dirty());
    }

    #[test]
    fn test_allowlist_common_set_is_monotonic() {
        // An attribute in the common allow-set is never removed,
        // regardless of element kind.
        let config = Config::default();
        let rule = AllowListRule::new(&config);
        for text in [
            r#"<input type="date" className="a" />"#,
            r#"<input type="checkbox" className="a" />"#,
            r#"<span className="a" />"#,
        ] {
            let u = unit(text);
            let mut tree = parse(&u);
            let findings = rule.apply(&u, &mut tree).unwrap();
            assert!(findings.is_empty(), "removed common attribute in {}", text);
        }
    }

    #[test]
    fn test_allowlist_defaults_to_base_kind() {
        let config = Config::default();
        let rule = AllowListRule::new(&config);
        // No type attribute: kind defaults to text-input
        let u = unit(r#"<input placeholder="name" min="3" />"#);
        let mut tree = parse(&u);

        let findings = rule.apply(&u, &mut tree).unwrap();
        // placeholder allowed for text-input, min is not
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("'min'"));
        assert!(findings[0].message.contains("text-input"));
    }

    #[test]
    fn test_allowlist_ignores_component_elements() {
        let config = Config::default();
        let rule = AllowListRule::new(&config);
        let u = unit(r#"<DateInput anythingGoes="1" />"#);
        let mut tree = parse(&u);
        assert!(rule.apply(&u, &mut tree).unwrap().is_empty());
    }

    #[test]
    fn test_allowlist_severity_override() {
        let mut config = Config::default();
        config
            .severity
            .insert("attribute-allowlist".to_string(), Severity::Info);
        let rule = AllowListRule::new(&config);
        let u = unit(r#"<input type="date" foo="1" />"#);
        let mut tree = parse(&u);
        let findings = rule.apply(&u, &mut tree).unwrap();
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_allowlist_is_idempotent() {
        let config = Config::default();
        let rule = AllowListRule::new(&config);
        let u = unit(r#"<input type="date" foo="bar" bar="baz" />"#);
        let mut tree = parse(&u);
        let first = rule.apply(&u, &mut tree).unwrap();
        assert_eq!(first.len(), 2);

        let u2 = unit(&tree.regenerate());
        let mut tree2 = parse(&u2);
        let second = rule.apply(&u2, &mut tree2).unwrap();
        assert!(second.is_empty());
        assert!(!tree2.is_dirty());
    }

    #[test]
    fn test_duplicate_last_write_wins() {
        let config = Config::default();
        let rule = DuplicateAttributeRule::new(&config);
        let u = unit(r#"<input a="1" a="2" />"#);
        let mut tree = parse(&u);

        let findings = rule.apply(&u, &mut tree).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].fix_applied);
        assert!(findings[0].message.contains("duplicate attribute 'a'"));

        let text = tree.regenerate();
        assert_eq!(text, r#"<input a="2" />"#);
    }

    #[test]
    fn test_duplicate_reports_each_dropped_occurrence() {
        let config = Config::default();
        let rule = DuplicateAttributeRule::new(&config);
        let u = unit(r#"<input a="1" a="2" a="3" b="x" />"#);
        let mut tree = parse(&u);

        let findings = rule.apply(&u, &mut tree).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(tree.regenerate(), r#"<input a="3" b="x" />"#);
    }

    #[test]
    fn test_duplicate_spread_does_not_participate() {
        let config = Config::default();
        let rule = DuplicateAttributeRule::new(&config);
        let u = unit(r#"<input {...a} {...a} value="1" />"#);
        let mut tree = parse(&u);
        assert!(rule.apply(&u, &mut tree).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_is_idempotent() {
        let config = Config::default();
        let rule = DuplicateAttributeRule::new(&config);
        let u = unit(r#"<input a="1" a="2" />"#);
        let mut tree = parse(&u);
        rule.apply(&u, &mut tree).unwrap();

        let u2 = unit(&tree.regenerate());
        let mut tree2 = parse(&u2);
        assert!(rule.apply(&u2, &mut tree2).unwrap().is_empty());
    }
}
