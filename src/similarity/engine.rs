// src/similarity/engine.rs
//! Pairwise distances across a cohort, optionally against a prior cohort.

use super::comparison::{round_to, Comparison, MISSING_ROUTINE, NOT_COMPUTED, PARSE_ERROR};
use super::metrics::{Metric, MetricRegistry};
use super::selector::Selector;
use crate::error::{Result, UnicityError};
use crate::parse::SourceFile;
use crate::pool;
use crate::project::Project;
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// One comparison run.
#[derive(Debug, Clone)]
pub struct CompareRequest<'a> {
    pub selector: Selector,
    pub metric: String,
    pub template: Option<&'a SourceFile>,
    /// Prior cohort and the selector to apply to it.
    pub prior: Option<(&'a Project, Selector)>,
    /// Defaults to the project's configured worker count.
    pub workers: Option<usize>,
}

impl<'a> CompareRequest<'a> {
    /// # Errors
    /// Returns `InvalidSelector` for a malformed selector.
    pub fn new(selector: &str, metric: &str) -> Result<Self> {
        Ok(Self {
            selector: Selector::parse(selector)?,
            metric: metric.to_string(),
            template: None,
            prior: None,
            workers: None,
        })
    }

    #[must_use]
    pub fn template(mut self, template: &'a SourceFile) -> Self {
        self.template = Some(template);
        self
    }

    /// # Errors
    /// Returns `InvalidSelector` for a malformed prior selector.
    pub fn prior(mut self, project: &'a Project, selector: &str) -> Result<Self> {
        self.prior = Some((project, Selector::parse(selector)?));
        Ok(self)
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}

/// One row/column of the matrix.
struct Entry<'a> {
    client: &'a str,
    file: Cow<'a, SourceFile>,
    routine: Option<&'a str>,
    prior: bool,
}

impl Entry<'_> {
    /// Sentinel for an entry that cannot take part in any pair.
    fn unusable(&self) -> Option<f64> {
        if self.file.has_parse_error() {
            return Some(PARSE_ERROR);
        }
        match (self.routine, self.file.code()) {
            (None, _) => None,
            (Some(r), Some(code)) if code.line_span(r).is_some() => None,
            (Some(_), _) => Some(MISSING_ROUTINE),
        }
    }
}

struct PairResult {
    value: f64,
    failure: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityEngine {
    metrics: MetricRegistry,
}

impl SimilarityEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_metrics(metrics: MetricRegistry) -> Self {
        Self { metrics }
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricRegistry {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut MetricRegistry {
        &mut self.metrics
    }

    /// Computes the distance matrix for `request` over `project`.
    ///
    /// Rows are the project's clients by name, followed by the prior
    /// cohort's clients. Prior-to-prior pairs are left at `NOT_COMPUTED`.
    /// Metric failures are appended to the diagnostics file in the
    /// project's working directory.
    ///
    /// # Errors
    /// Returns `UnknownMetric`, `EmptySelection`, `UnsupportedConfiguration`
    /// (zero workers), or an I/O error writing diagnostics.
    pub fn compare(&self, project: &Project, request: &CompareRequest) -> Result<Comparison> {
        let metric = self.metrics.get(&request.metric)?;
        let workers = request.workers.unwrap_or(project.config.workers);
        if workers == 0 {
            return Err(UnicityError::UnsupportedConfiguration(
                "workers must be at least 1".to_string(),
            ));
        }

        let mut entries = select(project, &request.selector, false)?;
        if let Some((prior, selector)) = &request.prior {
            entries.extend(select(prior, selector, true)?);
        }
        let n = entries.len();
        tracing::info!(
            selector = %request.selector,
            metric = metric.name(),
            clients = n,
            workers,
            "computing distances"
        );

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| !(entries[i].prior && entries[j].prior))
            .collect();
        let results = pool::map_indexed(&pairs, workers, |&(i, j)| {
            evaluate(metric.as_ref(), &entries[i], &entries[j], request.template)
        });

        let precision = project.config.precision;
        let mut cmp = Comparison::new(
            n,
            &request.selector.to_string(),
            metric.name(),
            request.prior.as_ref().map(|(_, s)| s.to_string()).as_deref(),
        );
        for (i, entry) in entries.iter().enumerate() {
            if entry.unusable().is_none() {
                cmp.set_pair(i, i, 0.0);
            }
        }
        let mut failures = Vec::new();
        for (&(i, j), result) in pairs.iter().zip(results) {
            cmp.set_pair(i, j, round_to(result.value, precision));
            if let Some(reason) = result.failure {
                failures.push(format!(
                    "{} vs {} [{}]: {reason}",
                    entries[i].client,
                    entries[j].client,
                    metric.name()
                ));
            }
        }
        for entry in &entries {
            if entry.prior {
                cmp.prior_clients.push(entry.client.to_string());
            } else {
                cmp.clients.push(entry.client.to_string());
            }
        }

        if !failures.is_empty() {
            tracing::warn!(count = failures.len(), "metric failures");
            let log = project.workdir.join(&project.config.diagnostics_file);
            append_failures(&log, &failures)?;
        }
        Ok(cmp)
    }
}

/// One entry per client for `selector`.
fn select<'a>(project: &'a Project, selector: &'a Selector, prior: bool) -> Result<Vec<Entry<'a>>> {
    let matches = project.expected_matching(&selector.file)?;
    if matches.is_empty() {
        return Err(UnicityError::EmptySelection(selector.file.clone()));
    }
    Ok(project
        .clients()
        .map(|client| Entry {
            client: &client.name,
            file: selector.resolve(client, &matches),
            routine: selector.routine(),
            prior,
        })
        .collect())
}

fn evaluate(
    metric: &dyn Metric,
    a: &Entry,
    b: &Entry,
    template: Option<&SourceFile>,
) -> PairResult {
    let sentinel = match (a.unusable(), b.unusable()) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    };
    if let Some(value) = sentinel {
        return PairResult {
            value,
            failure: None,
        };
    }
    match metric.distance(&a.file, &b.file, template, a.routine, b.routine) {
        Ok(d) if (0.0..=1.0).contains(&d) => PairResult {
            value: d,
            failure: None,
        },
        Ok(d) => PairResult {
            value: NOT_COMPUTED,
            failure: Some(format!("distance {d} outside [0, 1]")),
        },
        Err(e) => PairResult {
            value: NOT_COMPUTED,
            failure: Some(format!("{e:#}")),
        },
    }
}

fn append_failures(path: &Path, failures: &[String]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| UnicityError::io(e, path))?;
    for line in failures {
        writeln!(file, "{line}").map_err(|e| UnicityError::io(e, path))?;
    }
    Ok(())
}
