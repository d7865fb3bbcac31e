// src/source/directory.rs
use super::{archive, basename, is_zip_name, ContainerKind, EntryOrigin, RawEntry};
use crate::error::{Result, UnicityError};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks `root` in name order and yields every regular file.
///
/// # Errors
/// Returns error on walk or read failure.
pub fn entries(root: &Path) -> Result<Vec<RawEntry>> {
    let mut out = Vec::new();
    for rel in walk_files(root)? {
        let full = root.join(&rel);
        let bytes = fs::read(&full).map_err(|e| UnicityError::io(e, &full))?;
        let rel_str = normalize_path(&rel);
        let name = basename(&rel_str).to_string();

        if is_zip_name(&name) {
            if let Some(inner) = archive::expand_nested(&bytes, &name, || EntryOrigin {
                kind: ContainerKind::Directory,
                container: root.to_path_buf(),
                outer: Some(rel_str.clone()),
                path: String::new(),
            }) {
                out.extend(inner);
                continue;
            }
            tracing::warn!(entry = %rel_str, "nested archive unreadable, treating as opaque file");
        }

        out.push(RawEntry {
            author_hint: None,
            raw_name: name,
            bytes,
            origin: EntryOrigin {
                kind: ContainerKind::Directory,
                container: root.to_path_buf(),
                outer: None,
                path: rel_str,
            },
        });
    }
    Ok(out)
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()));

    for item in walker {
        let entry = item?;
        if entry.file_type().is_file() {
            let p = entry.path().strip_prefix(root).unwrap_or(entry.path());
            paths.push(p.to_path_buf());
        }
    }
    Ok(paths)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name == "__MACOSX" || name == "__pycache__"
}

/// Normalizes a path to use forward slashes.
fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_directories_are_skipped() {
        let d = tempfile::tempdir().unwrap();
        fs::create_dir(d.path().join(".git")).unwrap();
        fs::write(d.path().join(".git").join("HEAD"), "ref").unwrap();
        fs::write(d.path().join("alice_sub.py"), "x = 1\n").unwrap();
        let found = entries(d.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_name, "alice_sub.py");
        assert_eq!(found[0].origin.reopen().unwrap(), b"x = 1\n");
    }

    #[test]
    fn entries_come_back_sorted() {
        let d = tempfile::tempdir().unwrap();
        fs::write(d.path().join("bob_sub.py"), "").unwrap();
        fs::write(d.path().join("alice_sub.py"), "").unwrap();
        let names: Vec<_> = entries(d.path()).unwrap().into_iter().map(|e| e.raw_name).collect();
        assert_eq!(names, vec!["alice_sub.py", "bob_sub.py"]);
    }
}
