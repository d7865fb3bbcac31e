// src/testing/outcome.rs
use crate::project::TestStatus;
use serde::Serialize;
use std::collections::BTreeMap;

pub const PASSED: i32 = 0;
pub const MISSING_FILE: i32 = -1;
pub const FAILED: i32 = -2;
pub const COMPILE_ERROR: i32 = -3;
pub const TIMEOUT: i32 = -4;

/// Numeric result code of a status.
#[must_use]
pub fn code_of(status: TestStatus) -> i32 {
    match status {
        TestStatus::Passed => PASSED,
        TestStatus::Failed | TestStatus::Unset => FAILED,
        TestStatus::CompileError => COMPILE_ERROR,
        TestStatus::MissingFile | TestStatus::Absent => MISSING_FILE,
        TestStatus::Timeout => TIMEOUT,
    }
}

/// What happened to one client.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub client: String,
    pub status: TestStatus,
    pub code: i32,
    /// Captured stderr for failures, or a note for timeouts.
    pub traceback: Option<String>,
    /// The synthesized program, when one was run.
    #[serde(skip)]
    pub program: Option<String>,
}

impl TestOutcome {
    #[must_use]
    pub fn new(client: &str, status: TestStatus) -> Self {
        Self {
            client: client.to_string(),
            status,
            code: code_of(status),
            traceback: None,
            program: None,
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: String) -> Self {
        self.program = Some(program);
        self
    }

    #[must_use]
    pub fn with_traceback(mut self, traceback: String) -> Self {
        self.traceback = Some(traceback);
        self
    }

    /// Failures and timeouts get a diagnostics file.
    #[must_use]
    pub fn needs_diagnostics(&self) -> bool {
        matches!(self.status, TestStatus::Failed | TestStatus::Timeout)
    }
}

/// All outcomes of one unit test, in client order.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub test: String,
    pub outcomes: Vec<TestOutcome>,
}

impl TestReport {
    #[must_use]
    pub fn outcome(&self, client: &str) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|o| o.client == client)
    }

    #[must_use]
    pub fn counts(&self) -> BTreeMap<TestStatus, usize> {
        let mut counts = BTreeMap::new();
        for o in &self.outcomes {
            *counts.entry(o.status).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TestStatus::Passed)
            .count()
    }
}
