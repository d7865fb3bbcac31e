// src/testing/unit.rs
//! The unit test handed to the runner: a Python function body plus the
//! helpers it needs.

use crate::error::{Result, UnicityError};
use crate::lang::extension;
use crate::parse::{python, ImportDep};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static FROM_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*from[ \t]+([A-Za-z_][\w.]*)[ \t]+import\b")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTest {
    /// Name of the test function; called with no arguments.
    pub name: String,
    /// Full source of the `def`, at module indentation.
    pub body: String,
    /// Module-level source the body depends on: imports, functions and
    /// classes, in the order they should appear.
    pub helpers: Vec<String>,
}

impl UnitTest {
    #[must_use]
    pub fn new(name: &str, body: &str, helpers: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            body: body.to_string(),
            helpers,
        }
    }

    /// Takes test function `name` from a Python module, together with every
    /// function and class it reaches and the module imports those use.
    ///
    /// # Errors
    /// Returns `UnknownRoutine` if the module does not parse or has no
    /// top-level function called `name`.
    pub fn from_module(source: &str, name: &str) -> Result<Self> {
        let code = python::parse(source);
        if let Some(err) = &code.parse_error {
            return Err(UnicityError::UnknownRoutine(format!("{name} ({err})")));
        }
        let routine = code
            .routine(name)
            .filter(|_| !name.contains('.'))
            .ok_or_else(|| UnicityError::UnknownRoutine(name.to_string()))?;
        let lines: Vec<&str> = source.lines().collect();

        let mut classes: BTreeSet<&str> =
            routine.class_dependencies.iter().map(String::as_str).collect();
        let mut functions: BTreeSet<&str> = BTreeSet::new();
        for dep in &routine.dependencies {
            match dep.split_once('.') {
                Some((class, _)) => {
                    classes.insert(class);
                }
                None => {
                    functions.insert(dep.as_str());
                }
            }
        }

        let mut imports: BTreeSet<&ImportDep> = routine.imports.iter().collect();
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for f in &functions {
            if let Some(r) = code.routine(f) {
                imports.extend(r.imports.iter());
                spans.push((r.first_line, r.last_line));
            }
        }
        for c in &classes {
            if let Some(class) = code.classes.get(*c) {
                for method in &class.methods {
                    if let Some(r) = code.routine(method) {
                        imports.extend(r.imports.iter());
                    }
                }
                spans.push((class.first_line, class.last_line));
            }
        }
        spans.sort_unstable();

        let mut helpers: Vec<String> = imports.into_iter().map(render_import).collect();
        helpers.extend(spans.into_iter().map(|(a, b)| slice(&lines, a, b)));

        Ok(Self {
            name: name.to_string(),
            body: slice(&lines, routine.first_line, routine.last_line),
            helpers,
        })
    }

    /// Modules named in `from X import ...` statements of the body and
    /// helpers, in order of first appearance.
    #[must_use]
    pub fn imported_modules(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        std::iter::once(&self.body)
            .chain(self.helpers.iter())
            .flat_map(|text| FROM_IMPORT_RE.captures_iter(text))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .filter(|m| seen.insert(m.clone()))
            .collect()
    }

    /// Expected files the test imports from, as `(module, file name)`.
    ///
    /// # Errors
    /// Returns `NoClientImport` if the test imports no expected module.
    pub fn client_modules(&self, expected: &[String]) -> Result<Vec<(String, String)>> {
        let modules: Vec<(String, String)> = self
            .imported_modules()
            .into_iter()
            .filter_map(|module| {
                expected
                    .iter()
                    .find(|file| module_of(file) == Some(module.as_str()))
                    .map(|file| (module, file.clone()))
            })
            .collect();
        if modules.is_empty() {
            return Err(UnicityError::NoClientImport(self.name.clone()));
        }
        Ok(modules)
    }
}

/// Python module name of an expected file (`sub.py` is `sub`).
#[must_use]
pub fn module_of(file: &str) -> Option<&str> {
    match extension(file) {
        Some(ext) if ext.eq_ignore_ascii_case("py") => file.rsplit_once('.').map(|(stem, _)| stem),
        _ => None,
    }
}

fn render_import(dep: &ImportDep) -> String {
    match &dep.name {
        Some(name) => format!("from {} import {name}", dep.module),
        None => format!("import {}", dep.module),
    }
}

fn slice(lines: &[&str], first: usize, last: usize) -> String {
    let end = (last + 1).min(lines.len());
    lines.get(first..end).map(|l| l.join("\n")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = "\
import math

def square(x):
    return x * x

class Shape:
    def area(self):
        return math.pi * square(2)

def unrelated():
    pass

def test_area():
    from sub import area
    s = Shape()
    assert abs(area() - s.area()) < 1e-9
";

    #[test]
    fn from_module_collects_closure() {
        let t = UnitTest::from_module(MODULE, "test_area").unwrap();
        assert!(t.body.starts_with("def test_area():"));
        assert!(t.body.ends_with("< 1e-9"));
        assert!(t.helpers.iter().any(|h| h == "import math"));
        assert!(t.helpers.iter().any(|h| h.starts_with("def square")));
        assert!(t.helpers.iter().any(|h| h.starts_with("class Shape")));
        assert!(!t.helpers.iter().any(|h| h.contains("unrelated")));
        let square = t.helpers.iter().position(|h| h.starts_with("def square"));
        let shape = t.helpers.iter().position(|h| h.starts_with("class Shape"));
        assert!(square < shape);
    }

    #[test]
    fn unknown_test_is_an_error() {
        let err = UnitTest::from_module(MODULE, "test_missing").unwrap_err();
        assert!(matches!(err, UnicityError::UnknownRoutine(_)));
    }

    #[test]
    fn client_modules_need_an_expected_import() {
        let expected = vec!["sub.py".to_string(), "data.txt".to_string()];
        let t = UnitTest::new("t", "def t():\n    from sub import f\n    from os import path\n", Vec::new());
        assert_eq!(
            t.client_modules(&expected).unwrap(),
            vec![("sub".to_string(), "sub.py".to_string())]
        );
        let none = UnitTest::new("t", "def t():\n    import sub\n", Vec::new());
        assert!(matches!(
            none.client_modules(&expected),
            Err(UnicityError::NoClientImport(_))
        ));
    }
}
