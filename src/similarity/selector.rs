// src/similarity/selector.rs
//! `file`, `file/function` and `file/Class.method` selectors.

use crate::error::{Result, UnicityError};
use crate::parse::{CodeFile, FileContent, SourceFile};
use crate::project::{has_glob_chars, Client};
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Expected file name, or a glob over expected names.
    pub file: String,
    pub routine: Option<String>,
}

impl Selector {
    /// # Errors
    /// Returns `InvalidSelector` for empty parts, whitespace, or more than
    /// one `/`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || UnicityError::InvalidSelector(text.to_string());
        if text.is_empty() || text.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let mut parts = text.split('/');
        let file = parts.next().filter(|f| !f.is_empty()).ok_or_else(invalid)?;
        let routine = parts.next();
        if parts.next().is_some() || routine.is_some_and(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self {
            file: file.to_string(),
            routine: routine.map(str::to_string),
        })
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        has_glob_chars(&self.file)
    }

    #[must_use]
    pub fn routine(&self) -> Option<&str> {
        self.routine.as_deref()
    }

    /// The client's file for this selector. `matches` are the expected
    /// names the file part resolved to. A single literal match borrows the
    /// client's file; wildcards build a merged pseudo-file. Clients missing
    /// every matching file get a placeholder carrying a parse error.
    #[must_use]
    pub fn resolve<'a>(&self, client: &'a Client, matches: &[&str]) -> Cow<'a, SourceFile> {
        if !self.is_wildcard() {
            return matches
                .first()
                .and_then(|name| client.file(name))
                .map_or_else(|| Cow::Owned(SourceFile::placeholder(&self.file)), Cow::Borrowed);
        }
        let present: Vec<&SourceFile> = matches.iter().filter_map(|m| client.file(m)).collect();
        if present.is_empty() {
            return Cow::Owned(SourceFile::placeholder(&self.file));
        }
        Cow::Owned(merge(&self.file, &present))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.routine {
            Some(r) => write!(f, "{}/{r}", self.file),
            None => f.write_str(&self.file),
        }
    }
}

/// Concatenates streams and definitions of `files`, in the given order.
/// The first definition of a name wins; spans and line numbers are shifted
/// into the merged file.
fn merge(name: &str, files: &[&SourceFile]) -> SourceFile {
    let mut merged = CodeFile::default();
    let mut lines = Vec::new();
    let mut language: Option<String> = None;

    for file in files {
        let line_offset = lines.len();
        lines.extend(file.lines.iter().cloned());
        let Some(code) = file.code() else { continue };
        if let Some(err) = &code.parse_error {
            return SourceFile {
                name: name.to_string(),
                raw_name: file.raw_name.clone(),
                lines,
                content: FileContent::Code(CodeFile::failed(
                    &code.language,
                    format!("{}: {err}", file.name),
                )),
                origin: None,
            };
        }
        language.get_or_insert_with(|| code.language.clone());
        let kw_offset = merged.keywords.len();
        merged.keywords.extend(code.keywords.iter().cloned());
        for (key, routine) in &code.routines {
            merged.routines.entry(key.clone()).or_insert_with(|| {
                let mut r = routine.clone();
                r.span = (r.span.start + kw_offset)..(r.span.end + kw_offset);
                r.first_line += line_offset;
                r.last_line += line_offset;
                r
            });
        }
        for (key, class) in &code.classes {
            merged.classes.entry(key.clone()).or_insert_with(|| {
                let mut c = class.clone();
                c.span = (c.span.start + kw_offset)..(c.span.end + kw_offset);
                c.first_line += line_offset;
                c.last_line += line_offset;
                c
            });
        }
    }
    merged.language = language.unwrap_or_default();
    SourceFile {
        name: name.to_string(),
        raw_name: files
            .iter()
            .map(|f| f.raw_name.as_str())
            .collect::<Vec<_>>()
            .join("+"),
        lines,
        content: FileContent::Code(merged),
        origin: None,
    }
}
