// src/lang.rs
//! Parser registry keyed by file extension.

use crate::parse::types::CodeFile;
use crate::parse::{matlab, python};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Turns source text into a keyword stream with its routines.
pub trait SourceParser: Send + Sync {
    /// Language tag stored on every `CodeFile` this parser returns.
    fn language(&self) -> &str;

    /// Lowercase extensions, without the dot.
    fn extensions(&self) -> &[&str];

    /// Never fails: structurally invalid input yields a `CodeFile` with a
    /// parse-error marker.
    fn parse(&self, source: &str) -> CodeFile;
}

pub struct PythonParser;

impl SourceParser for PythonParser {
    fn language(&self) -> &str {
        python::LANGUAGE
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse(&self, source: &str) -> CodeFile {
        python::parse(source)
    }
}

pub struct MatlabParser;

impl SourceParser for MatlabParser {
    fn language(&self) -> &str {
        matlab::LANGUAGE
    }

    fn extensions(&self) -> &[&str] {
        &["m"]
    }

    fn parse(&self, source: &str) -> CodeFile {
        matlab::parse(source)
    }
}

/// Extension to parser map, populated once before ingest.
#[derive(Clone)]
pub struct ParserRegistry {
    by_ext: BTreeMap<String, Arc<dyn SourceParser>>,
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_ext.keys()).finish()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ParserRegistry {
    /// A registry with no parsers at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_ext: BTreeMap::new(),
        }
    }

    /// Python and MATLAB.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PythonParser));
        registry.register(Arc::new(MatlabParser));
        registry
    }

    /// Registers `parser` for each of its extensions, replacing any earlier
    /// registration.
    pub fn register(&mut self, parser: Arc<dyn SourceParser>) {
        for ext in parser.extensions() {
            self.by_ext.insert(ext.to_ascii_lowercase(), Arc::clone(&parser));
        }
    }

    #[must_use]
    pub fn for_extension(&self, ext: &str) -> Option<&dyn SourceParser> {
        self.by_ext.get(&ext.to_ascii_lowercase()).map(|p| &**p)
    }

    /// Parser for a file name, by its extension.
    #[must_use]
    pub fn for_name(&self, name: &str) -> Option<&dyn SourceParser> {
        extension(name).and_then(|ext| self.for_extension(ext))
    }

    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.by_ext.values().map(|p| p.language()).collect();
        langs.sort_unstable();
        langs.dedup();
        langs
    }
}

/// Extension of a bare file name, without the dot.
#[must_use]
pub fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
