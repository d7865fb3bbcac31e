// src/project/client.rs
use crate::parse::SourceFile;
use crate::roster::AttrValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Completeness of a portfolio against the expected-file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioStatus {
    Complete,
    Partial,
    /// Listed in the roster, nothing submitted.
    Absent,
}

impl fmt::Display for PortfolioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Absent => "absent",
        };
        f.write_str(s)
    }
}

/// Result of the most recent unit test run against a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    #[default]
    Unset,
    Passed,
    Failed,
    CompileError,
    MissingFile,
    Timeout,
    Absent,
}

impl TestStatus {
    /// Applies a new run's status. `Passed` is sticky.
    pub fn record(&mut self, next: TestStatus) {
        if *self != Self::Passed {
            *self = next;
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::CompileError => "COMPILE_ERROR",
            Self::MissingFile => "MISSING_FILE",
            Self::Timeout => "TIMEOUT",
            Self::Absent => "ABSENT",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One author's portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub name: String,
    /// Roster columns for this client; empty without a roster.
    pub attributes: BTreeMap<String, AttrValue>,
    /// Canonical expected name to file.
    pub files: BTreeMap<String, SourceFile>,
    /// Expected names with no file, in expected-list order.
    pub missing: Vec<String>,
    /// Raw names of files displaced from a slot by a better match.
    pub extras: Vec<String>,
    /// Entries dropped by the ignore list.
    pub ignored: usize,
    pub test_status: TestStatus,
    #[serde(skip)]
    pub(crate) slot_scores: BTreeMap<String, u8>,
}

impl Client {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: BTreeMap::new(),
            files: BTreeMap::new(),
            missing: Vec::new(),
            extras: Vec::new(),
            ignored: 0,
            test_status: TestStatus::Unset,
            slot_scores: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn status(&self) -> PortfolioStatus {
        if self.files.is_empty() && self.ignored == 0 && self.extras.is_empty() {
            PortfolioStatus::Absent
        } else if self.missing.is_empty() {
            PortfolioStatus::Complete
        } else {
            PortfolioStatus::Partial
        }
    }

    #[must_use]
    pub fn file(&self, name: &str) -> Option<&SourceFile> {
        self.files.get(name)
    }

    #[must_use]
    pub fn is_missing(&self, name: &str) -> bool {
        !self.files.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_is_sticky() {
        let mut s = TestStatus::Unset;
        s.record(TestStatus::Failed);
        assert_eq!(s, TestStatus::Failed);
        s.record(TestStatus::Passed);
        s.record(TestStatus::Timeout);
        assert_eq!(s, TestStatus::Passed);
    }

    #[test]
    fn status_follows_missing_list() {
        let mut c = Client::new("alice");
        assert_eq!(c.status(), PortfolioStatus::Absent);
        c.files.insert("a.py".into(), SourceFile::placeholder("a.py"));
        assert_eq!(c.status(), PortfolioStatus::Complete);
        c.missing.push("b.py".into());
        assert_eq!(c.status(), PortfolioStatus::Partial);
    }
}
