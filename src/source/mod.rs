// src/source/mod.rs
//! Uniform enumeration of submission entries.
//!
//! A project container is either a directory tree or a zip archive. Entries
//! that are themselves zips are expanded exactly one level; anything nested
//! deeper is yielded as an opaque file.

pub mod archive;
pub mod directory;

use crate::error::{Result, UnicityError};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Directory,
    Archive,
}

/// Where an entry's bytes came from. Plain data, so it can cross worker
/// boundaries; `reopen` acquires a fresh handle on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOrigin {
    pub kind: ContainerKind,
    pub container: PathBuf,
    /// Path of the nested archive inside the container, if any.
    pub outer: Option<String>,
    /// Path of the entry inside the container (or inside `outer`).
    pub path: String,
}

impl EntryOrigin {
    /// Re-reads the entry content with a newly opened handle.
    ///
    /// # Errors
    /// Returns error if the container or entry is no longer readable.
    pub fn reopen(&self) -> Result<Vec<u8>> {
        match (&self.kind, &self.outer) {
            (ContainerKind::Directory, None) => {
                let path = self.container.join(&self.path);
                std::fs::read(&path).map_err(|e| UnicityError::io(e, path))
            }
            (ContainerKind::Directory, Some(outer)) => {
                let path = self.container.join(outer);
                let bytes = std::fs::read(&path).map_err(|e| UnicityError::io(e, path))?;
                archive::read_nested(&bytes, &self.path)
            }
            (ContainerKind::Archive, None) => archive::read_entry(&self.container, &self.path),
            (ContainerKind::Archive, Some(outer)) => {
                let bytes = archive::read_entry(&self.container, outer)?;
                archive::read_nested(&bytes, &self.path)
            }
        }
    }
}

/// One file yielded by a container.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Basename of the enclosing nested archive; carries the author when
    /// inner entries are named without one.
    pub author_hint: Option<String>,
    /// Basename of the entry itself.
    pub raw_name: String,
    pub bytes: Vec<u8>,
    pub origin: EntryOrigin,
}

impl RawEntry {
    /// An entry built in memory, with an origin relative to the current
    /// directory.
    #[must_use]
    pub fn new(raw_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            author_hint: None,
            raw_name: raw_name.to_string(),
            bytes,
            origin: EntryOrigin {
                kind: ContainerKind::Directory,
                container: PathBuf::from("."),
                outer: None,
                path: raw_name.to_string(),
            },
        }
    }
}

/// A validated project container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl ProjectSource {
    /// Classifies `path` as a directory or a readable zip.
    ///
    /// # Errors
    /// Returns `InvalidProjectSource` if it is neither.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        if path.is_file() && archive::is_readable_zip(path) {
            return Ok(Self::Archive(path.to_path_buf()));
        }
        Err(UnicityError::InvalidProjectSource(path.to_path_buf()))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(p) | Self::Archive(p) => p,
        }
    }

    /// Root name: the directory name, or the archive stem.
    #[must_use]
    pub fn root_name(&self) -> String {
        let path = self.path();
        let stem = match self {
            Self::Directory(_) => path.file_name(),
            Self::Archive(_) => path.file_stem(),
        };
        stem.map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
    }

    /// Reads every entry, expanding nested archives one level.
    ///
    /// # Errors
    /// Returns error if the container cannot be walked or read.
    pub fn entries(&self) -> Result<Vec<RawEntry>> {
        match self {
            Self::Directory(root) => directory::entries(root),
            Self::Archive(path) => archive::entries(path),
        }
    }
}

/// Final path segment of an entry name, for either separator.
#[must_use]
pub fn basename(name: &str) -> &str {
    name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name)
}

#[must_use]
pub fn is_zip_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}
