// src/parse/matlab.rs
//! MATLAB keyword tokenizer.
//!
//! Not a parser: comments and string literals are blanked out, every
//! vocabulary pattern is matched over the remaining text, and the hits are
//! sorted by byte offset to form the keyword stream. `function` lines split
//! the file into routines; each routine owns the hits between its header and
//! the next header.

use super::types::{CodeFile, Routine};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const LANGUAGE: &str = "matlab";

/// (emitted token, pattern) pairs.
const VOCABULARY: &[(&str, &str)] = &[
    ("for", r"\b(?:par)?for\b"),
    ("while", r"\bwhile\b"),
    ("if", r"\b(?:else)?if\b"),
    ("else", r"\belse\b"),
    ("and", r"&&?"),
    ("or", r"\|\|?"),
    ("not", r"~[^=]"),
    ("break", r"\bbreak\b"),
    ("continue", r"\bcontinue\b"),
    ("try_except", r"\btry\b"),
    ("switch", r"\bswitch\b"),
    ("case", r"\bcase\b"),
    ("return", r"\breturn\b"),
];

/// Built-in callables worth distinguishing in a stream.
const BUILTINS: &[&str] = &[
    "abs", "all", "any", "ceil", "cell", "disp", "error", "find", "floor", "fprintf", "input",
    "isempty", "length", "max", "mean", "min", "mod", "num2str", "numel", "ones", "plot", "rand",
    "round", "size", "sort", "sprintf", "sqrt", "str2num", "strcmp", "sum", "zeros",
];

static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    let mut compiled: Vec<(&'static str, Regex)> = VOCABULARY
        .iter()
        .filter_map(|(token, pattern)| Regex::new(pattern).ok().map(|re| (*token, re)))
        .collect();
    compiled.extend(BUILTINS.iter().filter_map(|name| {
        Regex::new(&format!(r"\b{name}\s*\(")).ok().map(|re| (*name, re))
    }));
    compiled
});

static FUNCTION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*function\b(?:[^=\n]*=)?[ \t]*([A-Za-z_]\w*)").ok()
});

/// Block openers, `end`, and brackets (inside which `end` is an index).
static BLOCK_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|for|parfor|while|switch|try|function|end)\b|[()\[\]{}]").ok()
});

/// Tokenizes MATLAB source into a `CodeFile`.
#[must_use]
pub fn parse(source: &str) -> CodeFile {
    let masked = mask_comments_and_strings(source);
    let line_starts = line_starts(source);
    if let Err(message) = check_blocks(&masked, &line_starts) {
        tracing::debug!(%message, "matlab block structure invalid");
        return CodeFile::failed(LANGUAGE, message);
    }
    let headers = function_headers(&masked);

    let mut hits: Vec<(usize, String)> = Vec::new();
    for (token, re) in PATTERNS.iter() {
        hits.extend(re.find_iter(&masked).map(|m| (m.start(), (*token).to_string())));
    }
    let user_names: BTreeSet<&str> = headers.iter().map(|(_, name)| name.as_str()).collect();
    for name in &user_names {
        if let Ok(re) = Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))) {
            let header_offsets: BTreeSet<usize> = headers
                .iter()
                .filter(|(_, n)| n == name)
                .map(|(o, _)| *o)
                .collect();
            hits.extend(
                re.find_iter(&masked)
                    .filter(|m| !is_header_position(&masked, &header_offsets, m.start()))
                    .map(|m| (m.start(), (*name).to_string())),
            );
        }
    }
    hits.sort_by_key(|(offset, _)| *offset);

    let total_lines = line_starts.len();
    let keywords: Vec<String> = hits.iter().map(|(_, t)| t.clone()).collect();

    let mut file = CodeFile {
        language: LANGUAGE.to_string(),
        keywords,
        ..CodeFile::default()
    };

    for (idx, (offset, name)) in headers.iter().enumerate() {
        let end_offset = headers.get(idx + 1).map_or(masked.len(), |(o, _)| *o);
        let start = hits.partition_point(|(o, _)| *o < *offset);
        let end = hits.partition_point(|(o, _)| *o < end_offset);
        let first_line = line_of(&line_starts, *offset);
        let last_line = if end_offset >= masked.len() {
            total_lines.saturating_sub(1)
        } else {
            line_of(&line_starts, end_offset).saturating_sub(1).max(first_line)
        };
        let callees: BTreeSet<String> = file.keywords[start..end]
            .iter()
            .filter(|k| user_names.contains(k.as_str()) || BUILTINS.contains(&k.as_str()))
            .cloned()
            .collect();
        let local_callees: BTreeSet<String> = callees
            .iter()
            .filter(|c| user_names.contains(c.as_str()) && *c != name)
            .cloned()
            .collect();
        file.routines.insert(
            name.clone(),
            Routine {
                name: name.clone(),
                first_line,
                last_line,
                docstring: help_text(source, first_line),
                span: start..end,
                keywords: file.keywords[start..end].to_vec(),
                callees,
                dependencies: local_callees.clone(),
                local_callees,
                classes: BTreeSet::new(),
                imports: Vec::new(),
                class_dependencies: BTreeSet::new(),
            },
        );
    }
    resolve_calls(&mut file);
    file
}

/// MATLAB has no classes here, so the closure is calls only.
fn resolve_calls(file: &mut CodeFile) {
    if let Err(e) = super::closure::resolve_all(&mut file.routines, &file.classes) {
        tracing::warn!(error = %e, "dependency closure failed");
        *file = CodeFile::failed(LANGUAGE, e.to_string());
    }
}

/// Matches block openers against `end`. Functions may omit their `end`;
/// any other block left open, or an `end` with nothing to close, is an error.
fn check_blocks(masked: &str, line_starts: &[usize]) -> Result<(), String> {
    let Some(re) = BLOCK_RE.as_ref() else {
        return Ok(());
    };
    let mut open: Vec<(&str, usize)> = Vec::new();
    let mut brackets = 0usize;
    for m in re.find_iter(masked) {
        let line = line_of(line_starts, m.start()) + 1;
        match m.as_str() {
            "(" | "[" | "{" => brackets += 1,
            ")" | "]" | "}" => brackets = brackets.saturating_sub(1),
            _ if brackets > 0 => {}
            "end" => {
                if open.pop().is_none() {
                    return Err(format!("unmatched `end` at line {line}"));
                }
            }
            opener => open.push((opener, line)),
        }
    }
    match open.iter().find(|(kind, _)| *kind != "function") {
        Some((kind, line)) => Err(format!("`{kind}` at line {line} is never closed")),
        None => Ok(()),
    }
}

fn is_header_position(masked: &str, header_offsets: &BTreeSet<usize>, pos: usize) -> bool {
    // The header match starts at the line start; the name sits later on it.
    let line_start = masked[..pos].rfind('\n').map_or(0, |i| i + 1);
    header_offsets.contains(&line_start)
}

/// (line start offset, function name) for every header.
fn function_headers(masked: &str) -> Vec<(usize, String)> {
    let Some(re) = FUNCTION_RE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((whole.start(), name.as_str().to_string()))
        })
        .collect()
}

/// Blanks `%` comments and quoted strings with spaces, keeping offsets.
fn mask_comments_and_strings(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_block = false;
    for line in source.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == "%{" {
            in_block = true;
        }
        if in_block {
            out.push_str(&blank(line));
            if trimmed == "%}" {
                in_block = false;
            }
            continue;
        }
        out.push_str(&mask_line(line));
    }
    out
}

fn mask_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                    out.push(c);
                } else if c == '\n' {
                    out.push(c);
                } else {
                    push_blank(&mut out, c);
                }
            }
            None if c == '%' => {
                push_blank(&mut out, c);
                for rest in chars.by_ref() {
                    if rest == '\n' {
                        out.push(rest);
                    } else {
                        push_blank(&mut out, rest);
                    }
                }
                break;
            }
            // A quote after an operand is the transpose operator.
            None if c == '"' || (c == '\'' && !is_operand_end(prev)) => {
                quote = Some(c);
                out.push(c);
            }
            None => out.push(c),
        }
        if !c.is_whitespace() {
            prev = c;
        }
    }
    out
}

fn is_operand_end(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ')' | ']' | '}' | '.' | '\'')
}

fn push_blank(out: &mut String, c: char) {
    for _ in 0..c.len_utf8() {
        out.push(' ');
    }
}

fn blank(line: &str) -> String {
    line.chars()
        .map(|c| if c == '\n' { "\n".to_string() } else { " ".repeat(c.len_utf8()) })
        .collect()
}

fn line_starts(source: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .filter(|&i| i < source.len() || i == 0)
        .collect()
}

fn line_of(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&s| s <= offset).saturating_sub(1)
}

/// Leading `%` comment block after a function header.
fn help_text(source: &str, header_line: usize) -> String {
    source
        .lines()
        .skip(header_line + 1)
        .take_while(|l| l.trim_start().starts_with('%'))
        .map(|l| l.trim_start().trim_start_matches('%').trim())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_sorted_by_offset() {
        let file = parse("for i = 1:n\n  if x && ~y\n    disp(i)\n  end\nend\n");
        assert_eq!(file.keywords, vec!["for", "if", "and", "not", "disp"]);
        assert!(file.is_valid());
    }

    #[test]
    fn comments_and_strings_are_ignored() {
        let file = parse("% for while if\nx = 'if else';\ny = a';\nwhile true\nend\n");
        assert_eq!(file.keywords, vec!["while"]);
    }

    #[test]
    fn functions_become_routines() {
        let src = "function y = outer(x)\n% Doubles x.\ny = inner(x);\nend\n\nfunction z = inner(x)\nfor k = 1:2\nend\nz = 2*x;\nend\n";
        let file = parse(src);
        let outer = file.routine("outer").unwrap();
        assert_eq!(outer.first_line, 0);
        assert_eq!(outer.keywords, vec!["inner"]);
        assert_eq!(outer.docstring, "Doubles x.");
        assert!(outer.dependencies.contains("inner"));
        let inner = file.routine("inner").unwrap();
        assert_eq!(inner.first_line, 5);
        assert_eq!(inner.last_line, 9);
        assert_eq!(inner.keywords, vec!["for"]);
    }

    #[test]
    fn unclosed_block_is_a_parse_error() {
        let file = parse("function y = f(x)\nif x\n  y = 1;\n");
        assert!(!file.is_valid());
        assert!(file.routines.is_empty());
        assert!(file.parse_error.unwrap().contains("`if` at line 2"));
    }

    #[test]
    fn surplus_end_is_a_parse_error() {
        let file = parse("function y = f(x)\ny = x;\nend\nend\nend\n");
        assert!(!file.is_valid());
        assert!(file.parse_error.unwrap().contains("line 4"));
    }

    #[test]
    fn index_end_and_endless_functions_are_fine() {
        let src = "function y = f(x)\ny = x(end) + x{end};\nif y\n  y = g(y);\nend\n\nfunction z = g(w)\nz = w(2:end);\n";
        let file = parse(src);
        assert!(file.is_valid(), "{:?}", file.parse_error);
        assert_eq!(file.routines.len(), 2);
    }

    #[test]
    fn elseif_counts_as_if() {
        let file = parse("if a\nelseif b\nelse\nend\n");
        assert_eq!(file.keywords, vec!["if", "if", "else"]);
    }
}
