// src/testing/runner.rs
//! Runs a unit test against every client in a separate interpreter.

use super::outcome::{TestOutcome, TestReport};
use super::synth::synthesize;
use super::unit::UnitTest;
use crate::config::UnicityConfig;
use crate::error::{Result, UnicityError};
use crate::pool;
use crate::project::{Client, PortfolioStatus, Project, TestStatus};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// How to execute the synthesized programs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workers: usize,
    /// Honored only with a single worker.
    pub timeout: Option<Duration>,
    /// Interpreter command line, split with shell rules.
    pub python: String,
}

impl RunOptions {
    #[must_use]
    pub fn from_config(config: &UnicityConfig) -> Self {
        Self {
            workers: config.workers,
            timeout: config.timeout(),
            python: config.python.clone(),
        }
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> Result<Vec<String>> {
        if self.workers == 0 {
            return Err(UnicityError::UnsupportedConfiguration(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.workers > 1 && self.timeout.is_some() {
            return Err(UnicityError::UnsupportedConfiguration(format!(
                "a timeout cannot be enforced with {} workers",
                self.workers
            )));
        }
        let argv = shell_words::split(&self.python).map_err(|e| {
            UnicityError::UnsupportedConfiguration(format!("interpreter '{}': {e}", self.python))
        })?;
        if argv.is_empty() {
            return Err(UnicityError::UnsupportedConfiguration(
                "interpreter command is empty".to_string(),
            ));
        }
        Ok(argv)
    }
}

/// A client whose program is ready to run.
struct Job {
    client: String,
    program: String,
}

/// Runs `test` for every client of `project`, updates each client's test
/// status and writes diagnostics for failures and timeouts under
/// `<workdir>/<test name>/`.
///
/// # Errors
/// Returns `UnsupportedConfiguration` or `NoClientImport` before anything
/// runs, or an I/O error writing diagnostics.
pub fn run(project: &mut Project, test: &UnitTest, options: &RunOptions) -> Result<TestReport> {
    let argv = options.validate()?;
    let modules = test.client_modules(&project.expected)?;
    let module_names: Vec<String> = modules.iter().map(|(m, _)| m.clone()).collect();
    tracing::info!(test = %test.name, clients = project.len(), workers = options.workers, "running unit test");

    let mut outcomes: Vec<Option<TestOutcome>> = Vec::with_capacity(project.len());
    let mut jobs: Vec<(usize, Job)> = Vec::new();
    for (idx, client) in project.clients().enumerate() {
        match prepare(client, test, &modules, &module_names) {
            Ok(job) => {
                outcomes.push(None);
                jobs.push((idx, job));
            }
            Err(outcome) => outcomes.push(Some(outcome)),
        }
    }

    let workdir = project.workdir.clone();
    let timeout = options.timeout;
    let job_list: Vec<&Job> = jobs.iter().map(|(_, j)| j).collect();
    let results = pool::map_indexed(&job_list, options.workers, |job| {
        execute(job, &argv, &workdir, timeout)
    });
    for ((idx, _), outcome) in jobs.iter().zip(results) {
        if let Some(slot) = outcomes.get_mut(*idx) {
            *slot = Some(outcome);
        }
    }
    let outcomes: Vec<TestOutcome> = outcomes.into_iter().flatten().collect();

    let diag_dir = project.workdir.join(&test.name);
    for outcome in outcomes.iter().filter(|o| o.needs_diagnostics()) {
        write_diagnostics(&diag_dir, &test.name, outcome)?;
    }
    for outcome in &outcomes {
        tracing::debug!(client = %outcome.client, status = %outcome.status, "unit test outcome");
        if let Some(client) = project.client_mut(&outcome.client) {
            client.test_status.record(outcome.status);
        }
    }

    Ok(TestReport {
        test: test.name.clone(),
        outcomes,
    })
}

/// Program for `client`, or the outcome that makes running it pointless.
fn prepare(
    client: &Client,
    test: &UnitTest,
    modules: &[(String, String)],
    module_names: &[String],
) -> std::result::Result<Job, TestOutcome> {
    if client.status() == PortfolioStatus::Absent {
        return Err(TestOutcome::new(&client.name, TestStatus::Absent));
    }
    let mut files = Vec::with_capacity(modules.len());
    for (_, file_name) in modules {
        match client.file(file_name) {
            Some(f) => files.push(f),
            None => return Err(TestOutcome::new(&client.name, TestStatus::MissingFile)),
        }
    }
    if let Some(bad) = files.iter().find(|f| f.has_parse_error()) {
        let reason = bad
            .code()
            .and_then(|c| c.parse_error.clone())
            .unwrap_or_default();
        return Err(TestOutcome::new(&client.name, TestStatus::CompileError)
            .with_traceback(format!("{}: {reason}", bad.name)));
    }
    Ok(Job {
        client: client.name.clone(),
        program: synthesize(test, module_names, &files),
    })
}

fn execute(job: &Job, argv: &[String], workdir: &Path, timeout: Option<Duration>) -> TestOutcome {
    match spawn_and_wait(job, argv, workdir, timeout) {
        Ok(Finished::Exited { success: true, .. }) => {
            TestOutcome::new(&job.client, TestStatus::Passed).with_program(job.program.clone())
        }
        Ok(Finished::Exited { stderr, .. }) => TestOutcome::new(&job.client, TestStatus::Failed)
            .with_traceback(stderr)
            .with_program(job.program.clone()),
        Ok(Finished::TimedOut(limit)) => TestOutcome::new(&job.client, TestStatus::Timeout)
            .with_traceback(format!("timeout: no result after {:.1}s", limit.as_secs_f64()))
            .with_program(job.program.clone()),
        Err(e) => {
            tracing::warn!(client = %job.client, error = %e, "could not run unit test");
            TestOutcome::new(&job.client, TestStatus::Failed)
                .with_traceback(format!("could not run interpreter: {e}"))
                .with_program(job.program.clone())
        }
    }
}

enum Finished {
    Exited { success: bool, stderr: String },
    TimedOut(Duration),
}

/// Writes the program to a temporary script and runs it. Output goes to
/// temporary files so a chatty child cannot block on a full pipe.
fn spawn_and_wait(
    job: &Job,
    argv: &[String],
    workdir: &Path,
    timeout: Option<Duration>,
) -> std::io::Result<Finished> {
    let mut script = tempfile::Builder::new()
        .prefix("unicity_")
        .suffix(".py")
        .tempfile()?;
    script.write_all(job.program.as_bytes())?;
    script.flush()?;
    let mut stderr = tempfile::tempfile()?;

    let (program, args) = argv
        .split_first()
        .ok_or_else(|| std::io::Error::other("empty interpreter command"))?;
    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .arg(script.path())
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(stderr.try_clone()?)
        .spawn()?;

    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit)? {
            Some(status) => status,
            None => {
                child.kill()?;
                child.wait()?;
                return Ok(Finished::TimedOut(limit));
            }
        },
        None => child.wait()?,
    };
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::trace!(client = %job.client, elapsed_ms, "interpreter exited");

    let mut captured = String::new();
    stderr.seek(SeekFrom::Start(0))?;
    stderr.read_to_string(&mut captured)?;
    Ok(Finished::Exited {
        success: status.success(),
        stderr: captured,
    })
}

/// `test_<client>_<test>.py`: the traceback as a leading string literal,
/// then the program.
fn write_diagnostics(dir: &Path, test_name: &str, outcome: &TestOutcome) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| UnicityError::io(e, dir))?;
    let path: PathBuf = dir.join(format!("test_{}_{test_name}.py", outcome.client));
    let note = outcome
        .traceback
        .as_deref()
        .unwrap_or("")
        .replace("\"\"\"", "\\\"\\\"\\\"");
    let program = outcome.program.as_deref().unwrap_or("");
    let content = format!("\"\"\"\n{}\n\"\"\"\n\n{program}", note.trim_end());
    fs::write(&path, content).map_err(|e| UnicityError::io(e, &path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_with_workers_is_rejected() {
        let opts = RunOptions {
            workers: 2,
            timeout: Some(Duration::from_secs(1)),
            python: "python3".into(),
        };
        assert!(matches!(
            opts.validate(),
            Err(UnicityError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn interpreter_is_split_like_a_shell() {
        let opts = RunOptions {
            workers: 1,
            timeout: None,
            python: "env 'PYTHONHASHSEED=0' python3 -I".into(),
        };
        assert_eq!(opts.validate().unwrap(), vec!["env", "PYTHONHASHSEED=0", "python3", "-I"]);
    }

    #[test]
    fn diagnostics_escape_triple_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = TestOutcome::new("alice", TestStatus::Failed)
            .with_traceback("AssertionError: \"\"\"".into())
            .with_program("x = 1\n".into());
        write_diagnostics(dir.path(), "test_add", &outcome).unwrap();
        let text = fs::read_to_string(dir.path().join("test_alice_test_add.py")).unwrap();
        assert!(text.starts_with("\"\"\"\nAssertionError: \\\"\\\"\\\"\n\"\"\""));
        assert!(text.ends_with("x = 1\n"));
    }
}
