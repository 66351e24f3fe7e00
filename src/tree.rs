//! Tree query and mutation capability
//!
//! The minimal surface every rule programs against: enumerate markup
//! elements and import declarations, remove or replace attributes,
//! rewrite import specifiers. Mutations are recorded as byte-span
//! edits over the original text; `regenerate` splices them back so
//! untouched regions stay byte-identical.

use crate::finding::Location;
use std::path::PathBuf;

/// A half-open byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// One attribute on a markup element
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Attribute name ("..." for spread attributes)
    pub name: String,
    /// Literal value, when the attribute has a quoted one
    pub value: Option<String>,
    /// Whether this is a spread/rest attribute (`{...props}`)
    pub spread: bool,
    /// Span covering the attribute and its leading whitespace
    pub span: Span,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Set when a rule removed this attribute
    pub removed: bool,
}

impl Attribute {
    pub fn location(&self, file: &std::path::Path) -> Location {
        Location::new(file.to_path_buf(), self.line, self.column)
    }
}

/// A markup element's opening tag
#[derive(Debug, Clone)]
pub struct ElementNode {
    /// Tag name
    pub tag: String,
    /// Whether this is a native element (lowercase tag)
    pub native: bool,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
    /// Span of the opening tag
    pub span: Span,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl ElementNode {
    /// Literal value of a named attribute, if present and not removed
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| !a.removed && !a.spread && a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    pub fn location(&self, file: &std::path::Path) -> Location {
        Location::new(file.to_path_buf(), self.line, self.column)
    }
}

/// An import declaration
#[derive(Debug, Clone)]
pub struct ImportNode {
    /// Module specifier as written
    pub specifier: String,
    /// Span of the specifier contents (between the quotes)
    pub span: Span,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl ImportNode {
    pub fn location(&self, file: &std::path::Path) -> Location {
        Location::new(file.to_path_buf(), self.line, self.column)
    }
}

/// A recorded text edit
#[derive(Debug, Clone)]
struct Edit {
    span: Span,
    replacement: String,
}

/// Parsed form of one source file, owned by the pipeline for the
/// duration of one rule step.
#[derive(Debug)]
pub struct SyntaxTree {
    file: PathBuf,
    text: String,
    elements: Vec<ElementNode>,
    imports: Vec<ImportNode>,
    edits: Vec<Edit>,
}

impl SyntaxTree {
    pub(crate) fn new(
        file: PathBuf,
        text: String,
        elements: Vec<ElementNode>,
        imports: Vec<ImportNode>,
    ) -> Self {
        Self {
            file,
            text,
            elements,
            imports,
            edits: Vec::new(),
        }
    }

    /// Path of the file this tree was parsed from
    pub fn file(&self) -> &std::path::Path {
        &self.file
    }

    /// Original source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Markup elements in source order
    pub fn elements(&self) -> &[ElementNode] {
        &self.elements
    }

    /// Import declarations in source order
    pub fn imports(&self) -> &[ImportNode] {
        &self.imports
    }

    /// Remove an attribute from an element.
    ///
    /// The node model is updated so later queries within the same rule
    /// step do not see the attribute again.
    pub fn remove_attribute(&mut self, element: usize, attribute: usize) {
        let attr = &mut self.elements[element].attributes[attribute];
        if attr.removed {
            return;
        }
        attr.removed = true;
        let span = attr.span;
        self.push_edit(span, String::new());
    }

    /// Replace an import declaration's module specifier
    pub fn set_import_specifier(&mut self, import: usize, specifier: &str) {
        let node = &mut self.imports[import];
        if node.specifier == specifier {
            return;
        }
        let span = node.span;
        node.specifier = specifier.to_string();
        self.push_edit(span, specifier.to_string());
    }

    /// Whether any mutation has been recorded
    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }

    fn push_edit(&mut self, span: Span, replacement: String) {
        debug_assert!(
            !self.edits.iter().any(|e| e.span.overlaps(&span)),
            "overlapping edits within one rule step"
        );
        self.edits.push(Edit { span, replacement });
    }

    /// Splice recorded edits back into the original text.
    ///
    /// Edits are applied in descending offset order so earlier spans
    /// stay valid; regions outside any edit are byte-identical to the
    /// input, and an unmutated tree regenerates the exact input.
    pub fn regenerate(&self) -> String {
        if self.edits.is_empty() {
            return self.text.clone();
        }

        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by(|a, b| b.span.start.cmp(&a.span.start));

        let mut out = self.text.clone();
        for edit in edits {
            out.replace_range(edit.span.start..edit.span.end, &edit.replacement);
        }
        out
    }
}

/// Compute the 1-based line and column of a byte offset
pub(crate) fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let prefix = &text[..offset.min(text.len())];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(nl) => offset - nl,
        None => offset + 1,
    };
    (line, column)
}
