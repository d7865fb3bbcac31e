// src/project/mod.rs
//! A cohort of client portfolios ingested from one container.

pub mod assemble;
pub mod client;

pub use self::client::{Client, PortfolioStatus, TestStatus};

use crate::config::UnicityConfig;
use crate::error::{Result, UnicityError};
use crate::lang::{extension, ParserRegistry};
use crate::parse;
use crate::roster::Roster;
use crate::source::{ProjectSource, RawEntry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Construction parameters for a `Project`.
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    pub expected: Vec<String>,
    pub ignore: Vec<String>,
    pub roster: Option<Roster>,
    /// Where test diagnostics and logs go; defaults to the current
    /// directory.
    pub workdir: Option<PathBuf>,
    pub config: UnicityConfig,
    pub parsers: ParserRegistry,
}

impl ProjectOptions {
    #[must_use]
    pub fn new<I, S>(expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: expected.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn roster(mut self, roster: Roster) -> Self {
        self.roster = Some(roster);
        self
    }

    #[must_use]
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: UnicityConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }
}

/// Ingested cohort. Clients are keyed and iterated by name.
#[derive(Debug, Clone)]
pub struct Project {
    pub root_name: String,
    pub source: Option<ProjectSource>,
    pub workdir: PathBuf,
    pub expected: Vec<String>,
    pub ignore: Vec<String>,
    pub roster: Option<Roster>,
    pub config: UnicityConfig,
    pub parsers: ParserRegistry,
    clients: BTreeMap<String, Client>,
}

impl Project {
    /// Opens a directory or zip and ingests every entry.
    ///
    /// # Errors
    /// Returns `InvalidProjectSource` for an unusable path, `UnknownParser`
    /// for an expected code file with no parser, and any ingest error.
    pub fn open(path: &Path, options: ProjectOptions) -> Result<Self> {
        let source = ProjectSource::open(path)?;
        let root_name = source.root_name();
        tracing::info!(root = %root_name, path = %path.display(), "opening project");
        let entries = source.entries()?;
        Self::from_entries(root_name, Some(source), entries, options)
    }

    /// Ingests already-enumerated entries.
    ///
    /// # Errors
    /// Same as [`Project::open`] after the container is read.
    pub fn from_entries(
        root_name: String,
        source: Option<ProjectSource>,
        entries: Vec<RawEntry>,
        options: ProjectOptions,
    ) -> Result<Self> {
        options.config.validate()?;
        check_parsers(&options.expected, &options.parsers)?;

        let router = assemble::Router {
            expected: &options.expected,
            ignore: &options.ignore,
            roster: options.roster.as_ref(),
            threshold: options.config.fuzzy_threshold,
            parsers: &options.parsers,
        };
        let clients = assemble::assemble(entries, &router)?;

        let workdir = match options.workdir {
            Some(dir) => dir,
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        Ok(Self {
            root_name,
            source,
            workdir,
            expected: options.expected,
            ignore: options.ignore,
            roster: options.roster,
            config: options.config,
            parsers: options.parsers,
            clients,
        })
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn clients_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.values_mut()
    }

    #[must_use]
    pub fn client(&self, name: &str) -> Option<&Client> {
        self.clients.get(name)
    }

    pub fn client_mut(&mut self, name: &str) -> Option<&mut Client> {
        self.clients.get_mut(name)
    }

    #[must_use]
    pub fn client_names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Clients with the given portfolio status, by name.
    #[must_use]
    pub fn with_status(&self, status: PortfolioStatus) -> Vec<&Client> {
        self.clients().filter(|c| c.status() == status).collect()
    }

    /// Expected names matching `pattern` (a glob or a literal name).
    ///
    /// # Errors
    /// Returns error if the glob is invalid.
    pub fn expected_matching(&self, pattern: &str) -> Result<Vec<&str>> {
        if !has_glob_chars(pattern) {
            return Ok(self
                .expected
                .iter()
                .filter(|e| *e == pattern)
                .map(String::as_str)
                .collect());
        }
        let matcher = globset::Glob::new(pattern)?.compile_matcher();
        Ok(self
            .expected
            .iter()
            .filter(|e| matcher.is_match(e.as_str()))
            .map(String::as_str)
            .collect())
    }
}

pub(crate) fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Every expected file that looks like code must have a parser.
fn check_parsers(expected: &[String], parsers: &ParserRegistry) -> Result<()> {
    for name in expected {
        let Some(ext) = extension(name) else { continue };
        if parsers.for_extension(ext).is_none() && !parse::is_data_extension(ext) {
            return Err(UnicityError::UnknownParser(name.clone()));
        }
    }
    Ok(())
}
