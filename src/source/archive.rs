// src/source/archive.rs
use super::{basename, is_zip_name, ContainerKind, EntryOrigin, RawEntry};
use crate::error::{Result, UnicityError};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

#[must_use]
pub fn is_readable_zip(path: &Path) -> bool {
    File::open(path)
        .ok()
        .and_then(|f| ZipArchive::new(f).ok())
        .is_some()
}

/// Yields every file of the zip at `path`, expanding nested zips once.
///
/// # Errors
/// Returns error if the archive or one of its entries cannot be read.
pub fn entries(path: &Path) -> Result<Vec<RawEntry>> {
    let file = File::open(path).map_err(|e| UnicityError::io(e, path))?;
    let mut zip = ZipArchive::new(file)?;
    let mut out = Vec::new();

    for (entry_path, bytes) in read_all(&mut zip)? {
        let name = basename(&entry_path).to_string();
        if is_zip_name(&name) {
            if let Some(inner) = expand_nested(&bytes, &name, || EntryOrigin {
                kind: ContainerKind::Archive,
                container: path.to_path_buf(),
                outer: Some(entry_path.clone()),
                path: String::new(),
            }) {
                out.extend(inner);
                continue;
            }
            tracing::warn!(entry = %entry_path, "nested archive unreadable, treating as opaque file");
        }
        out.push(RawEntry {
            author_hint: None,
            raw_name: name,
            bytes,
            origin: EntryOrigin {
                kind: ContainerKind::Archive,
                container: path.to_path_buf(),
                outer: None,
                path: entry_path,
            },
        });
    }
    Ok(out)
}

/// Expands a nested archive's files. Returns `None` if `bytes` is not a
/// readable zip. Zips inside it are not expanded again.
pub fn expand_nested<F>(bytes: &[u8], outer_name: &str, origin: F) -> Option<Vec<RawEntry>>
where
    F: Fn() -> EntryOrigin,
{
    let mut zip = ZipArchive::new(Cursor::new(bytes)).ok()?;
    let files = read_all(&mut zip).ok()?;
    let entries = files
        .into_iter()
        .map(|(inner_path, inner_bytes)| RawEntry {
            author_hint: Some(outer_name.to_string()),
            raw_name: basename(&inner_path).to_string(),
            bytes: inner_bytes,
            origin: EntryOrigin {
                path: inner_path,
                ..origin()
            },
        })
        .collect();
    Some(entries)
}

/// Reads one entry of the zip at `path`.
///
/// # Errors
/// Returns error if the archive or entry is unreadable.
pub fn read_entry(path: &Path, entry: &str) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| UnicityError::io(e, path))?;
    let mut zip = ZipArchive::new(file)?;
    read_named(&mut zip, entry)
}

/// Reads one entry of an in-memory zip.
///
/// # Errors
/// Returns error if the bytes are not a zip or the entry is missing.
pub fn read_nested(bytes: &[u8], entry: &str) -> Result<Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    read_named(&mut zip, entry)
}

fn read_named<R: Read + Seek>(zip: &mut ZipArchive<R>, entry: &str) -> Result<Vec<u8>> {
    let mut file = zip.by_name(entry)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_all<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        if is_metadata(&name) {
            continue;
        }
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        files.push((name, buf));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn is_metadata(name: &str) -> bool {
    name.starts_with("__MACOSX/") || basename(name).starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut w = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            w.start_file(*name, SimpleFileOptions::default()).unwrap();
            w.write_all(data).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn nested_zip_expands_one_level_only() {
        let deepest = zip_bytes(&[("x.py", b"pass\n")]);
        let inner = zip_bytes(&[("sub.py", b"x = 1\n"), ("deeper.zip", &deepest)]);
        let outer = zip_bytes(&[("alice_work.zip", &inner), ("bob_sub.py", b"y = 2\n")]);

        let d = tempfile::tempdir().unwrap();
        let path = d.path().join("cohort.zip");
        std::fs::write(&path, outer).unwrap();

        let found = entries(&path).unwrap();
        let names: Vec<_> = found.iter().map(|e| e.raw_name.as_str()).collect();
        assert_eq!(names, vec!["deeper.zip", "sub.py", "bob_sub.py"]);
        assert_eq!(found[1].author_hint.as_deref(), Some("alice_work.zip"));
        assert!(found[2].author_hint.is_none());
    }

    #[test]
    fn reopen_reads_through_nested_archive() {
        let inner = zip_bytes(&[("sub.py", b"x = 1\n")]);
        let outer = zip_bytes(&[("alice_work.zip", &inner)]);
        let d = tempfile::tempdir().unwrap();
        let path = d.path().join("cohort.zip");
        std::fs::write(&path, outer).unwrap();

        let found = entries(&path).unwrap();
        assert_eq!(found[0].origin.reopen().unwrap(), b"x = 1\n");
    }
}
