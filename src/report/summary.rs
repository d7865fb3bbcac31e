// src/report/summary.rs
//! Cohort summary grouped by portfolio status and, once tests have run,
//! by test status.

use crate::error::Result;
use crate::project::{PortfolioStatus, Project, TestStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialEntry {
    pub client: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub root: String,
    pub expected: Vec<String>,
    pub complete: Vec<String>,
    pub partial: Vec<PartialEntry>,
    pub absent: Vec<String>,
    /// Empty until some client has a test status.
    pub tests: BTreeMap<TestStatus, Vec<String>>,
}

impl Summary {
    #[must_use]
    pub fn new(project: &Project) -> Self {
        let mut summary = Self {
            root: project.root_name.clone(),
            expected: project.expected.clone(),
            complete: Vec::new(),
            partial: Vec::new(),
            absent: Vec::new(),
            tests: BTreeMap::new(),
        };
        for client in project.clients() {
            match client.status() {
                PortfolioStatus::Complete => summary.complete.push(client.name.clone()),
                PortfolioStatus::Partial => summary.partial.push(PartialEntry {
                    client: client.name.clone(),
                    missing: client.missing.clone(),
                }),
                PortfolioStatus::Absent => summary.absent.push(client.name.clone()),
            }
        }
        if project.clients().any(|c| c.test_status != TestStatus::Unset) {
            for client in project.clients() {
                summary
                    .tests
                    .entry(client.test_status)
                    .or_default()
                    .push(client.name.clone());
            }
        }
        summary
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.complete.len() + self.partial.len() + self.absent.len()
    }

    /// Section-wise plain text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Project: {}", self.root);
        let _ = writeln!(out, "Expected files: {}", self.expected.join(", "));
        let _ = writeln!(out, "Clients: {}", self.total());

        section(&mut out, "Complete", self.complete.iter().map(String::as_str));
        let _ = writeln!(out, "\nPartial ({})", self.partial.len());
        for entry in &self.partial {
            let _ = writeln!(out, "  {} (missing: {})", entry.client, entry.missing.join(", "));
        }
        section(&mut out, "Absent", self.absent.iter().map(String::as_str));

        for (status, names) in &self.tests {
            section(&mut out, &format!("Test {status}"), names.iter().map(String::as_str));
        }
        out
    }

    /// # Errors
    /// Returns error if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn section<'a>(out: &mut String, title: &str, names: impl ExactSizeIterator<Item = &'a str>) {
    let _ = writeln!(out, "\n{title} ({})", names.len());
    for name in names {
        let _ = writeln!(out, "  {name}");
    }
}
