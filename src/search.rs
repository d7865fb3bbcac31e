// src/search.rs
//! Literal substring search across portfolios.

use crate::error::{Result, UnicityError};
use crate::parse::SourceFile;
use crate::project::{Client, Project};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Where to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    Project,
    File(String),
    Routine { file: String, routine: String },
}

impl SearchScope {
    /// Parses `""`, `file` or `file/routine`.
    #[must_use]
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if selector.is_empty() {
            return Self::Project;
        }
        match selector.split_once('/') {
            Some((file, routine)) if !routine.is_empty() => Self::Routine {
                file: file.to_string(),
                routine: routine.to_string(),
            },
            Some((file, _)) => Self::File(file.to_string()),
            None => Self::File(selector.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineHit {
    /// 1-based, relative to the file.
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileHits {
    pub file: String,
    pub hits: Vec<LineHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientHits {
    pub client: String,
    pub files: Vec<FileHits>,
}

/// Searches every client for `needle`. Only clients with at least one hit
/// are returned, in client order; a client lists only files with hits.
#[must_use]
pub fn search(project: &Project, needle: &str, scope: &SearchScope) -> Vec<ClientHits> {
    let results: Vec<ClientHits> = project
        .clients()
        .filter_map(|client| search_client(client, needle, scope))
        .collect();
    tracing::debug!(needle, clients = results.len(), "string search");
    results
}

fn search_client(client: &Client, needle: &str, scope: &SearchScope) -> Option<ClientHits> {
    let files: Vec<FileHits> = client
        .files
        .values()
        .filter_map(|file| search_file(file, needle, scope))
        .collect();
    (!files.is_empty()).then(|| ClientHits {
        client: client.name.clone(),
        files,
    })
}

fn search_file(file: &SourceFile, needle: &str, scope: &SearchScope) -> Option<FileHits> {
    let range = match scope {
        SearchScope::Project => 0..file.lines.len(),
        SearchScope::File(name) if *name == file.name => 0..file.lines.len(),
        SearchScope::File(_) => return None,
        SearchScope::Routine { file: name, routine } => {
            if *name != file.name {
                return None;
            }
            let code = file.code().filter(|c| c.is_valid())?;
            let (first, last) = code.line_span(routine)?;
            first..(last + 1).min(file.lines.len())
        }
    };
    let hits: Vec<LineHit> = file
        .lines
        .get(range.clone())?
        .iter()
        .zip(range)
        .filter(|(line, _)| line.contains(needle))
        .map(|(line, idx)| LineHit {
            line: idx + 1,
            text: line.trim().to_string(),
        })
        .collect();
    (!hits.is_empty()).then(|| FileHits {
        file: file.name.clone(),
        hits,
    })
}

/// Text rendering: client name, then each file with `<line>> <text>` hits.
#[must_use]
pub fn render(results: &[ClientHits]) -> String {
    let mut out = String::new();
    for client in results {
        let _ = writeln!(out, "{}", client.client);
        for file in &client.files {
            let _ = writeln!(out, "  {}", file.file);
            for hit in &file.hits {
                let _ = writeln!(out, "    {}> {}", hit.line, hit.text);
            }
        }
        out.push('\n');
    }
    out
}

/// Writes [`render`] output to `path`.
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn save(results: &[ClientHits], path: &Path) -> Result<()> {
    std::fs::write(path, render(results)).map_err(|e| UnicityError::io(e, path))
}

/// Runs [`search`] and, when the project config names a `search_file`,
/// writes the rendering there (relative to the working directory).
///
/// # Errors
/// Returns error if the output file cannot be written.
pub fn search_and_record(
    project: &Project,
    needle: &str,
    scope: &SearchScope,
) -> Result<Vec<ClientHits>> {
    let results = search(project, needle, scope);
    if let Some(name) = &project.config.search_file {
        let path = project.workdir.join(name);
        save(&results, &path)?;
        tracing::info!(path = %path.display(), "search results written");
    }
    Ok(results)
}
