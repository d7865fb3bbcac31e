// src/parse/mod.rs
//! Turning submitted bytes into `SourceFile`s.

pub mod closure;
pub mod matlab;
pub mod python;
pub mod types;

pub use self::types::{ClassBase, ClassDef, CodeFile, FileContent, ImportDep, Routine, SourceFile};

use crate::lang::{extension, ParserRegistry};
use crate::source::EntryOrigin;

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "svg", "tif", "tiff"];

/// Compiled-language sources kept as text without a keyword stream.
const NATIVE_EXTS: &[&str] = &[
    "c", "h", "cc", "cpp", "cxx", "hpp", "java", "js", "ts", "rs", "go", "f90", "for",
];

const TEXT_EXTS: &[&str] = &[
    "txt", "md", "rst", "csv", "tsv", "json", "xml", "html", "yaml", "yml", "toml", "dat", "log",
    "pdf", "doc", "docx", "ipynb", "zip",
];

/// True for extensions that are kept as data and never parsed.
#[must_use]
pub fn is_data_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    [IMAGE_EXTS, NATIVE_EXTS, TEXT_EXTS]
        .iter()
        .any(|list| list.contains(&ext.as_str()))
}

/// Decodes bytes as UTF-8 (lossy), dropping a BOM and normalising line ends.
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Builds a `SourceFile` for the canonical slot `name`; the extension of
/// `name` selects the content variant and the parser.
#[must_use]
pub fn build(
    name: &str,
    raw_name: &str,
    bytes: &[u8],
    origin: Option<EntryOrigin>,
    parsers: &ParserRegistry,
) -> SourceFile {
    let ext = extension(name).map(str::to_ascii_lowercase).unwrap_or_default();
    let text = if IMAGE_EXTS.contains(&ext.as_str()) {
        String::new()
    } else {
        decode(bytes)
    };
    let content = if IMAGE_EXTS.contains(&ext.as_str()) {
        FileContent::Image { size: bytes.len() }
    } else if let Some(parser) = parsers.for_extension(&ext) {
        let code = parser.parse(&text);
        if let Some(err) = &code.parse_error {
            tracing::debug!(file = raw_name, error = %err, "parse error");
        }
        FileContent::Code(code)
    } else if NATIVE_EXTS.contains(&ext.as_str()) {
        FileContent::NativeSource
    } else {
        FileContent::PlainText
    };
    SourceFile {
        name: name.to_string(),
        raw_name: raw_name.to_string(),
        lines: text.lines().map(str::to_string).collect(),
        content,
        origin,
    }
}
