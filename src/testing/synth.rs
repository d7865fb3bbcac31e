// src/testing/synth.rs
//! Splices client code, helpers and the test body into one script.
//!
//! Client modules are inlined into a single namespace, so imports of those
//! modules are rewritten: `from m import x` becomes `pass` (the names are
//! already global), `from m import x as y` becomes `y = x`, and
//! `import m as k` binds `k` to the script module itself.

use super::unit::UnitTest;
use crate::parse::SourceFile;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)from[ \t]+([A-Za-z_][\w.]*)[ \t]+import\b(.*)$")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)import[ \t]+([A-Za-z_][\w.]*)(?:[ \t]+as[ \t]+([A-Za-z_]\w*))?[ \t]*(?:#.*)?$")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

const CWD_VAR: &str = "__unicity_cwd";
const OS_ALIAS: &str = "__unicity_os";

/// Builds the program run for one client. `files` are the client's
/// versions of `modules`, in the same order.
#[must_use]
pub fn synthesize(test: &UnitTest, modules: &[String], files: &[&SourceFile]) -> String {
    let modules: BTreeSet<&str> = modules.iter().map(String::as_str).collect();
    let mut sections: Vec<String> = Vec::new();

    for file in files {
        sections.push(format!("# ---- {} ----", file.name));
        sections.push(strip_client_imports(&file.text(), &modules));
    }
    if !test.helpers.is_empty() {
        sections.push("# ---- helpers ----".to_string());
        for helper in &test.helpers {
            sections.push(strip_client_imports(helper, &modules));
        }
    }
    sections.push("# ---- unit test ----".to_string());
    sections.push(strip_client_imports(&test.body, &modules));
    sections.push(wrapper(&test.name));

    let mut out = sections.join("\n\n");
    out.push('\n');
    out
}

fn wrapper(name: &str) -> String {
    format!(
        "import os as {OS_ALIAS}\n\
         {CWD_VAR} = {OS_ALIAS}.getcwd()\n\
         try:\n    {name}()\n\
         finally:\n    {OS_ALIAS}.chdir({CWD_VAR})"
    )
}

/// Rewrites imports of inlined modules, keeping line count and indentation.
#[must_use]
pub fn strip_client_imports(text: &str, modules: &BTreeSet<&str>) -> String {
    let mut out: Vec<String> = Vec::new();
    // Indent of an open parenthesised `from m import (...)`.
    let mut continuation: Option<String> = None;
    for line in text.lines() {
        if let Some(indent) = continuation.take() {
            let bindings = alias_bindings(line);
            out.push(if bindings.is_empty() {
                String::new()
            } else {
                format!("{indent}{bindings}")
            });
            if !line.contains(')') {
                continuation = Some(indent);
            }
            continue;
        }
        if let Some(caps) = FROM_RE.captures(line) {
            let module = caps.get(2).map_or("", |m| m.as_str());
            if modules.contains(module) {
                let indent = caps.get(1).map_or("", |m| m.as_str());
                let rest = caps.get(3).map_or("", |m| m.as_str());
                let bindings = alias_bindings(rest);
                if bindings.is_empty() {
                    out.push(format!("{indent}pass"));
                } else {
                    out.push(format!("{indent}{bindings}"));
                }
                if rest.contains('(') && !rest.contains(')') {
                    continuation = Some(indent.to_string());
                }
                continue;
            }
        }
        if let Some(caps) = IMPORT_RE.captures(line) {
            let module = caps.get(2).map_or("", |m| m.as_str());
            if modules.contains(module) {
                let indent = caps.get(1).map_or("", |m| m.as_str());
                let bound = caps.get(3).map_or(module, |m| m.as_str());
                out.push(format!(
                    "{indent}{bound} = __import__('sys').modules[__name__]"
                ));
                continue;
            }
        }
        out.push(line.to_string());
    }
    out.join("\n")
}

/// `y = x` assignments for every `x as y` in an import-name list.
fn alias_bindings(names: &str) -> String {
    let names = names.split('#').next().unwrap_or("");
    names
        .split(',')
        .filter_map(|item| {
            let item = item.trim_matches(|c: char| c.is_whitespace() || "()\\".contains(c));
            let mut words = item.split_whitespace();
            match (words.next(), words.next(), words.next()) {
                (Some(name), Some("as"), Some(alias)) if alias != name => {
                    Some(format!("{alias} = {name}"))
                }
                _ => None,
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules() -> BTreeSet<&'static str> {
        ["sub"].into_iter().collect()
    }

    #[test]
    fn from_imports_become_pass_at_same_indent() {
        let text = "def t():\n    from sub import add\n    from os import path\n";
        assert_eq!(
            strip_client_imports(text, &modules()),
            "def t():\n    pass\n    from os import path"
        );
    }

    #[test]
    fn parenthesised_imports_are_consumed() {
        let text = "from sub import (a,\n    b)\nx = 1";
        assert_eq!(strip_client_imports(text, &modules()), "pass\n\nx = 1");
    }

    #[test]
    fn aliased_from_imports_bind_the_alias() {
        let text = "def t():\n    from sub import add as plus, mul\n    return plus";
        assert_eq!(
            strip_client_imports(text, &modules()),
            "def t():\n    plus = add\n    return plus"
        );
        let text = "from sub import (a as b,\n    c as d)\nx = 1";
        assert_eq!(strip_client_imports(text, &modules()), "b = a\nd = c\nx = 1");
    }

    #[test]
    fn plain_imports_bind_the_script_module() {
        let text = "import sub as s\nimport subprocess";
        assert_eq!(
            strip_client_imports(text, &modules()),
            "s = __import__('sys').modules[__name__]\nimport subprocess"
        );
    }

    #[test]
    fn program_order_is_client_helpers_body_wrapper() {
        let test = UnitTest::new(
            "test_add",
            "def test_add():\n    from sub import add\n    assert add(2, 3) == 5",
            vec!["import math".to_string()],
        );
        let mut file = SourceFile::placeholder("sub.py");
        file.lines = vec!["def add(a, b):".into(), "    return a + b".into()];
        let program = synthesize(&test, &["sub".to_string()], &[&file]);
        let client = program.find("def add").unwrap();
        let helpers = program.find("import math").unwrap();
        let body = program.find("def test_add").unwrap();
        let call = program.find("    test_add()").unwrap();
        assert!(client < helpers && helpers < body && body < call);
        assert!(program.contains("__unicity_os.chdir(__unicity_cwd)"));
        assert!(!program.contains("from sub import"));
    }
}
