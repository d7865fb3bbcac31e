// src/similarity/metrics/command_freq.rs
//! Multiset overlap of keyword counts.

use super::{Metric, Streams};
use crate::parse::SourceFile;
use std::collections::HashMap;

pub struct CommandFreq;

impl Metric for CommandFreq {
    fn name(&self) -> &str {
        "command_freq"
    }

    fn distance(
        &self,
        a: &SourceFile,
        b: &SourceFile,
        template: Option<&SourceFile>,
        routine_a: Option<&str>,
        routine_b: Option<&str>,
    ) -> anyhow::Result<f64> {
        let s = Streams::of(a, b, template, routine_a, routine_b)?;
        Ok(distance(s.a, s.b, s.template))
    }
}

/// `1 - sum(min) / sum(max)` over per-keyword counts, after flooring each
/// count minus the template's count at zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn distance(a: &[String], b: &[String], template: Option<&[String]>) -> f64 {
    let mut ca = counts(a);
    let mut cb = counts(b);
    if let Some(t) = template {
        for (token, n) in counts(t) {
            for c in [&mut ca, &mut cb] {
                if let Some(v) = c.get_mut(token) {
                    *v = v.saturating_sub(n);
                }
            }
        }
    }
    let mut overlap = 0usize;
    let mut total = 0usize;
    for (token, &x) in &ca {
        let y = cb.get(token).copied().unwrap_or(0);
        overlap += x.min(y);
        total += x.max(y);
    }
    for (token, &y) in &cb {
        if !ca.contains_key(token) {
            total += y;
        }
    }
    if total == 0 {
        return 1.0;
    }
    1.0 - overlap as f64 / total as f64
}

fn counts(stream: &[String]) -> HashMap<&str, usize> {
    let mut map = HashMap::new();
    for token in stream {
        *map.entry(token.as_str()).or_insert(0) += 1;
    }
    map
}
