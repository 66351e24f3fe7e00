//! Parser adapter
//!
//! Wraps the source scanner behind a stable interface: `parse` turns a
//! file's text into a [`SyntaxTree`] of markup elements and import
//! declarations, `SyntaxTree::regenerate` turns it back into text.
//! Rule logic depends only on the tree API, never on how the text was
//! scanned.

use crate::tree::{line_column, Attribute, ElementNode, ImportNode, Span, SyntaxTree};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Extensions whose files carry embedded markup syntax
const MARKUP_EXTENSIONS: &[&str] = &["jsx", "tsx"];

/// One source file as read at scope-resolution time
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// File path
    pub path: PathBuf,
    /// File contents
    pub text: String,
    /// Whether embedded markup syntax is present
    pub has_markup: bool,
}

impl SourceUnit {
    /// Read a unit from disk
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_text(path, text))
    }

    /// Build a unit from in-memory text
    pub fn from_text(path: &Path, text: String) -> Self {
        let has_markup = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| MARKUP_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        Self {
            path: path.to_path_buf(),
            text,
            has_markup,
        }
    }
}

/// Error during parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{file}: {message}")]
    Malformed { file: PathBuf, message: String },
}

/// Parse a source unit into a syntax tree
pub fn parse(unit: &SourceUnit) -> Result<SyntaxTree, ParseError> {
    parse_text(&unit.text, &unit.path, unit.has_markup)
}

/// Parse raw text into a syntax tree
pub fn parse_text(text: &str, path: &Path, has_markup: bool) -> Result<SyntaxTree, ParseError> {
    let imports = scan_imports(text);
    let elements = if has_markup {
        scan_elements(text, path)?
    } else {
        Vec::new()
    };
    Ok(SyntaxTree::new(
        path.to_path_buf(),
        text.to_string(),
        elements,
        imports,
    ))
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*(?:import|export)\b(?:[^'"]*?\bfrom\b)?[ \t]*['"]([^'"\n]+)['"]"#)
            .unwrap()
    })
}

/// Find every import/re-export declaration and the byte span of its
/// module specifier.
fn scan_imports(text: &str) -> Vec<ImportNode> {
    let mut imports = Vec::new();
    for caps in import_regex().captures_iter(text) {
        let m = match caps.get(1) {
            Some(m) => m,
            None => continue,
        };
        let (line, column) = line_column(text, m.start());
        imports.push(ImportNode {
            specifier: m.as_str().to_string(),
            span: Span::new(m.start(), m.end()),
            line,
            column,
        });
    }
    imports
}

/// Scan for markup-element opening tags.
///
/// A `<` followed by a letter starts a candidate element; candidates
/// that do not scan as a well-formed opening tag (comparison operators,
/// generics) are skipped. A tag that is clearly an element but never
/// closes is a parse error.
fn scan_elements(text: &str, path: &Path) -> Result<Vec<ElementNode>, ParseError> {
    let bytes = text.as_bytes();
    let mut elements = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let next = bytes.get(i + 1).copied();
        if !next.map(|b| b.is_ascii_alphabetic()).unwrap_or(false) {
            i += 1;
            continue;
        }
        // A '<' preceded by an identifier character is a comparison or
        // a generic parameter list, not markup.
        if i > 0 && is_ident_byte(bytes[i - 1]) {
            i += 1;
            continue;
        }

        match scan_opening_tag(text, i, path)? {
            Some(element) => {
                let end = element.span.end;
                elements.push(element);
                i = end;
            }
            None => i += 1,
        }
    }

    Ok(elements)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.' || b == b')'
}

fn is_attr_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'@' || b == b'$'
}

fn is_attr_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.' | b'$')
}

/// Scan one opening tag starting at `start` (which points at `<`).
///
/// Returns `Ok(None)` when the candidate is not markup, `Err` when it
/// is markup that never terminates.
fn scan_opening_tag(
    text: &str,
    start: usize,
    path: &Path,
) -> Result<Option<ElementNode>, ParseError> {
    let bytes = text.as_bytes();
    let mut i = start + 1;

    let tag_start = i;
    while i < bytes.len() && (is_attr_name_byte(bytes[i]) || bytes[i].is_ascii_alphanumeric()) {
        i += 1;
    }
    let tag = &text[tag_start..i];
    if tag.is_empty() {
        return Ok(None);
    }
    // After the tag name only whitespace, '/', or '>' continues a tag.
    match bytes.get(i) {
        Some(b) if b.is_ascii_whitespace() || *b == b'/' || *b == b'>' => {}
        _ => return Ok(None),
    }

    let native = tag.as_bytes()[0].is_ascii_lowercase() && !tag.contains('.');
    let (line, column) = line_column(text, start);
    let mut attributes = Vec::new();
    let mut saw_structure = false;

    loop {
        let ws_start = i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        match bytes[i] {
            b'>' => {
                return Ok(Some(ElementNode {
                    tag: tag.to_string(),
                    native,
                    attributes,
                    span: Span::new(start, i + 1),
                    line,
                    column,
                }));
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return Ok(Some(ElementNode {
                        tag: tag.to_string(),
                        native,
                        attributes,
                        span: Span::new(start, i + 2),
                        line,
                        column,
                    }));
                }
                return Ok(None);
            }
            b'{' => {
                let brace_end = match scan_braced(text, i) {
                    Some(end) => end,
                    None => break,
                };
                let inner = text[i + 1..brace_end - 1].trim();
                let Some(rest) = inner.strip_prefix("...") else {
                    // Only spread attributes may appear braced inside
                    // an opening tag; anything else is not markup.
                    return Ok(None);
                };
                let (a_line, a_column) = line_column(text, i);
                attributes.push(Attribute {
                    name: format!("...{}", rest.trim()),
                    value: None,
                    spread: true,
                    span: Span::new(ws_start, brace_end),
                    line: a_line,
                    column: a_column,
                    removed: false,
                });
                saw_structure = true;
                i = brace_end;
            }
            b if is_attr_name_start(b) => {
                let name_start = i;
                i += 1;
                while i < bytes.len() && is_attr_name_byte(bytes[i]) {
                    i += 1;
                }
                let name = text[name_start..i].to_string();
                let (a_line, a_column) = line_column(text, name_start);
                let mut value = None;

                if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    match bytes.get(i) {
                        Some(&q) if q == b'"' || q == b'\'' => {
                            let value_start = i + 1;
                            let Some(close) = find_byte(bytes, value_start, q) else {
                                break;
                            };
                            value = Some(text[value_start..close].to_string());
                            i = close + 1;
                        }
                        Some(&b'{') => {
                            let Some(end) = scan_braced(text, i) else {
                                break;
                            };
                            i = end;
                        }
                        _ => return Ok(None),
                    }
                }

                attributes.push(Attribute {
                    name,
                    value,
                    spread: false,
                    span: Span::new(ws_start, i),
                    line: a_line,
                    column: a_column,
                    removed: false,
                });
                saw_structure = true;
            }
            _ => return Ok(None),
        }
    }

    // Reached end of input inside what was unambiguously an element.
    if saw_structure {
        return Err(ParseError::Malformed {
            file: path.to_path_buf(),
            message: format!("unterminated element <{}> at line {}", tag, line),
        });
    }
    Ok(None)
}

/// Find the byte position just past the brace that closes the one at
/// `start`, honoring string literals inside the expression.
fn scan_braced(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'"' | b'\'' | b'`' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Position just past the closing quote of the string starting at `i`
fn skip_string(bytes: &[u8], i: usize) -> Option<usize> {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
    None
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_markup(text: &str) -> SyntaxTree {
        parse_text(text, Path::new("test.tsx"), true).unwrap()
    }

    #[test]
    fn test_scan_imports_basic() {
        let text = "import React from 'react';\nimport { pad } from \"@pkg/utils\";\n";
        let tree = parse_text(text, Path::new("f.ts"), false).unwrap();
        let specs: Vec<&str> = tree.imports().iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specs, vec!["react", "@pkg/utils"]);
        assert_eq!(tree.imports()[1].line, 2);
    }

    #[test]
    fn test_scan_imports_side_effect_and_reexport() {
        let text = "import './styles.css';\nexport { X } from './x';\nexport * from './y';\n";
        let tree = parse_text(text, Path::new("f.ts"), false).unwrap();
        let specs: Vec<&str> = tree.imports().iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specs, vec!["./styles.css", "./x", "./y"]);
    }

    #[test]
    fn test_scan_imports_multiline() {
        let text = "import {\n  a,\n  b,\n} from './many';\n";
        let tree = parse_text(text, Path::new("f.ts"), false).unwrap();
        assert_eq!(tree.imports().len(), 1);
        assert_eq!(tree.imports()[0].specifier, "./many");
    }

    #[test]
    fn test_plain_strings_are_not_imports() {
        let text = "const s = 'not an import';\nexport const t = 'from nowhere';\n";
        let tree = parse_text(text, Path::new("f.ts"), false).unwrap();
        assert!(tree.imports().is_empty());
    }

    #[test]
    fn test_scan_element_attributes() {
        let tree = parse_markup(r#"const el = <input type="date" value={v} disabled {...rest} />;"#);
        assert_eq!(tree.elements().len(), 1);
        let el = &tree.elements()[0];
        assert_eq!(el.tag, "input");
        assert!(el.native);
        let names: Vec<&str> = el.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["type", "value", "disabled", "...rest"]);
        assert_eq!(el.attribute_value("type"), Some("date"));
        assert_eq!(el.attribute_value("value"), None); // expression value
        assert!(el.attributes[3].spread);
    }

    #[test]
    fn test_component_tags_are_not_native() {
        let tree = parse_markup("const el = <DateInput value={v} />;");
        assert_eq!(tree.elements().len(), 1);
        assert!(!tree.elements()[0].native);
    }

    #[test]
    fn test_comparisons_and_generics_are_skipped() {
        let text = "const ok = a < b;\nconst xs: Array<string> = [];\nif (x <y) {}\n";
        let tree = parse_markup(text);
        assert!(tree.elements().is_empty());
    }

    #[test]
    fn test_closing_tags_and_fragments_are_skipped() {
        let tree = parse_markup("const el = <div className=\"a\">text</div>;\nconst f = <></>;");
        assert_eq!(tree.elements().len(), 1);
        assert_eq!(tree.elements()[0].tag, "div");
    }

    #[test]
    fn test_nested_expression_values() {
        let tree =
            parse_markup(r#"<input max={fn({ a: '}' })} aria-label="x" />"#);
        let el = &tree.elements()[0];
        let names: Vec<&str> = el.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["max", "aria-label"]);
        assert_eq!(el.attribute_value("aria-label"), Some("x"));
    }

    #[test]
    fn test_unterminated_element_is_parse_error() {
        let err = parse_text("const el = <input type=\"date\" ", Path::new("bad.tsx"), true)
            .unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("unterminated element <input>"));
        assert!(msg.contains("bad.tsx"));
    }

    #[test]
    fn test_regenerate_round_trip_without_mutation() {
        let text = "import X from './x';\nconst el = <input type=\"date\" {...rest} />;\n";
        let tree = parse_markup(text);
        assert_eq!(tree.regenerate(), text);
    }

    #[test]
    fn test_attribute_spans_include_leading_whitespace() {
        let text = r#"<input type="date" foo="bar" />"#;
        let mut tree = parse_markup(text);
        tree.remove_attribute(0, 1);
        assert_eq!(tree.regenerate(), r#"<input type="date" />"#);
    }

    #[test]
    fn test_multiline_attributes() {
        let text = "<input\n  type=\"date\"\n  foo=\"bar\"\n/>";
        let mut tree = parse_markup(text);
        let el = &tree.elements()[0];
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attributes[1].line, 3);
        tree.remove_attribute(0, 1);
        assert_eq!(tree.regenerate(), "<input\n  type=\"date\"\n/>");
    }
}
