// src/similarity/metrics/mod.rs
//! Distance functions between two files or routines.
//!
//! Built-ins work on keyword streams. Any other `Metric` may be registered
//! by name; all are looked up through a `MetricRegistry` before a
//! comparison starts.

pub mod command_freq;
pub mod jaro;
pub mod moss;

use crate::error::{Result, UnicityError};
use crate::parse::SourceFile;
use anyhow::anyhow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A symmetric distance in `[0, 1]`.
///
/// `routine_a` and `routine_b` name the selected routine in `a` and `b`
/// (`None` for the whole file). The template, when given, is a reference
/// implementation whose contribution should be discounted. An `Err`, or a
/// value outside `[0, 1]`, is recorded as a metric failure.
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Any error marks the pair as not computable.
    fn distance(
        &self,
        a: &SourceFile,
        b: &SourceFile,
        template: Option<&SourceFile>,
        routine_a: Option<&str>,
        routine_b: Option<&str>,
    ) -> anyhow::Result<f64>;
}

/// Keyword streams of a pair plus the template's stream, if any.
pub(crate) struct Streams<'a> {
    pub a: &'a [String],
    pub b: &'a [String],
    pub template: Option<&'a [String]>,
}

impl<'a> Streams<'a> {
    /// The template is looked up under `routine_a`; a template without that
    /// routine contributes nothing.
    pub(crate) fn of(
        a: &'a SourceFile,
        b: &'a SourceFile,
        template: Option<&'a SourceFile>,
        routine_a: Option<&str>,
        routine_b: Option<&str>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            a: stream(a, routine_a)?,
            b: stream(b, routine_b)?,
            template: template
                .and_then(SourceFile::code)
                .filter(|c| c.is_valid())
                .and_then(|c| c.stream(routine_a)),
        })
    }
}

fn stream<'a>(file: &'a SourceFile, routine: Option<&str>) -> anyhow::Result<&'a [String]> {
    let code = file
        .code()
        .ok_or_else(|| anyhow!("{} has no keyword stream", file.name))?;
    code.stream(routine)
        .ok_or_else(|| anyhow!("{} has no routine {}", file.name, routine.unwrap_or("")))
}

/// Removes, for each template token, its first remaining occurrence in
/// `stream`; order of what is left is preserved.
#[must_use]
pub fn subtract_ordered(stream: &[String], template: &[String]) -> Vec<String> {
    let mut budget: HashMap<&str, usize> = HashMap::new();
    for t in template {
        *budget.entry(t.as_str()).or_insert(0) += 1;
    }
    stream
        .iter()
        .filter(|token| match budget.get_mut(token.as_str()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Name to metric map.
#[derive(Clone)]
pub struct MetricRegistry {
    metrics: BTreeMap<String, Arc<dyn Metric>>,
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.metrics.keys()).finish()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MetricRegistry {
    /// `command_freq`, `jaro` and `moss`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            metrics: BTreeMap::new(),
        };
        registry.register(Arc::new(command_freq::CommandFreq));
        registry.register(Arc::new(jaro::Jaro));
        registry.register(Arc::new(moss::Moss::default()));
        registry
    }

    /// Adds or replaces a metric under its own name.
    pub fn register(&mut self, metric: Arc<dyn Metric>) {
        self.metrics.insert(metric.name().to_string(), metric);
    }

    /// # Errors
    /// Returns `UnknownMetric` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Metric>> {
        self.metrics
            .get(name)
            .cloned()
            .ok_or_else(|| UnicityError::UnknownMetric(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}
