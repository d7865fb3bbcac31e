// src/parse/types.rs
//! Parsed representation of a single submitted file.

use crate::source::EntryOrigin;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

/// Reserved control words emitted into keyword streams.
pub const CONTROL_WORDS: &[&str] = &[
    "for",
    "while",
    "if",
    "else",
    "and",
    "or",
    "not",
    "break",
    "continue",
    "try_except",
    "import",
    "import_from",
];

/// Base of a class definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClassBase {
    /// No explicit base was declared.
    Classic,
    Named(String),
}

impl ClassBase {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Classic => None,
            Self::Named(n) => Some(n),
        }
    }
}

/// An import in `(module, name)` form; `name` is `None` for `import module`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ImportDep {
    pub module: String,
    pub name: Option<String>,
}

/// A function or method definition.
#[derive(Debug, Clone, Serialize)]
pub struct Routine {
    /// `function` or `Class.method`.
    pub name: String,
    /// 0-based, inclusive.
    pub first_line: usize,
    pub last_line: usize,
    pub docstring: String,
    /// Slice of the file's keyword stream covered by this routine.
    pub span: Range<usize>,
    pub keywords: Vec<String>,
    /// Every name called directly, resolved or not.
    pub callees: BTreeSet<String>,
    /// Routines of the same file referenced directly.
    pub local_callees: BTreeSet<String>,
    /// User-defined classes referenced directly.
    pub classes: BTreeSet<String>,
    pub imports: Vec<ImportDep>,
    /// Transitive closure of `local_callees`, through class methods.
    pub dependencies: BTreeSet<String>,
    /// Transitive closure of `classes`, through base-class chains.
    pub class_dependencies: BTreeSet<String>,
}

impl Routine {
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.last_line.saturating_sub(self.first_line) + 1
    }
}

/// A class definition.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDef {
    pub name: String,
    pub base: ClassBase,
    pub first_line: usize,
    pub last_line: usize,
    pub docstring: String,
    /// Qualified names (`Class.method`) of the methods, in source order.
    pub methods: Vec<String>,
    pub span: Range<usize>,
    pub keywords: Vec<String>,
}

/// A source file parsed into a keyword stream and its definitions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeFile {
    pub language: String,
    pub keywords: Vec<String>,
    pub routines: BTreeMap<String, Routine>,
    pub classes: BTreeMap<String, ClassDef>,
    /// Diagnostics for a structurally invalid file. When set, both maps are
    /// empty.
    pub parse_error: Option<String>,
}

impl CodeFile {
    /// A file that failed to parse.
    #[must_use]
    pub fn failed(language: &str, message: impl Into<String>) -> Self {
        Self {
            language: language.to_string(),
            parse_error: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.parse_error.is_none()
    }

    #[must_use]
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.get(name)
    }

    /// Routines ordered by their position in the file.
    #[must_use]
    pub fn routines_in_order(&self) -> Vec<&Routine> {
        let mut list: Vec<&Routine> = self.routines.values().collect();
        list.sort_by_key(|r| (r.span.start, r.first_line));
        list
    }

    /// Keyword stream for the whole file or for one routine. Classes count
    /// as routines here: `Class` selects the whole class body.
    #[must_use]
    pub fn stream(&self, routine: Option<&str>) -> Option<&[String]> {
        match routine {
            None => Some(&self.keywords),
            Some(name) => self
                .routines
                .get(name)
                .map(|r| r.keywords.as_slice())
                .or_else(|| self.classes.get(name).map(|c| c.keywords.as_slice())),
        }
    }

    /// 0-based inclusive line span of a routine or class.
    #[must_use]
    pub fn line_span(&self, name: &str) -> Option<(usize, usize)> {
        self.routines
            .get(name)
            .map(|r| (r.first_line, r.last_line))
            .or_else(|| self.classes.get(name).map(|c| (c.first_line, c.last_line)))
    }
}

/// What a file turned out to be.
#[derive(Debug, Clone, Serialize)]
pub enum FileContent {
    PlainText,
    Image { size: usize },
    NativeSource,
    Code(CodeFile),
}

/// One file of a client portfolio, keyed by its canonical name.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    /// Canonical name from the expected-file list.
    pub name: String,
    /// Name as submitted.
    pub raw_name: String,
    pub lines: Vec<String>,
    pub content: FileContent,
    #[serde(skip)]
    pub origin: Option<EntryOrigin>,
}

impl SourceFile {
    /// Stand-in for a file a client did not submit.
    #[must_use]
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            raw_name: String::new(),
            lines: Vec::new(),
            content: FileContent::Code(CodeFile::failed("none", "file not submitted")),
            origin: None,
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&CodeFile> {
        match &self.content {
            FileContent::Code(c) => Some(c),
            _ => None,
        }
    }

    /// True for code files carrying a parse-error marker.
    #[must_use]
    pub fn has_parse_error(&self) -> bool {
        self.code().is_some_and(|c| !c.is_valid())
    }

    #[must_use]
    pub fn text(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}
