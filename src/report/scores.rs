// src/report/scores.rs
//! Distributions derived from a distance matrix.
//!
//! Only cells in `[0, 1]` count. Prior-to-prior cells are never computed
//! and are skipped along with the sentinels.

use super::cluster::{single_linkage, Linkage};
use crate::similarity::Comparison;
use serde::Serialize;
use std::fmt::Write as _;

pub const DEFAULT_BINS: usize = 20;

/// Fixed-width bins over `[0, 1]`; `1.0` falls in the last bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub counts: Vec<usize>,
}

impl Histogram {
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn new(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let mut counts = vec![0; bins];
        for &v in values {
            let idx = ((v * bins as f64).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Self { counts }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_start(&self, idx: usize) -> f64 {
        idx as f64 / self.counts.len() as f64
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosePair {
    pub a: String,
    pub b: String,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub routine: String,
    pub metric: String,
    /// Every computed pair distance.
    pub pairwise: Vec<f64>,
    /// Smallest computed distance of each current-cohort client, by name.
    pub minimums: Vec<(String, f64)>,
    pub pairwise_histogram: Histogram,
    pub minimum_histogram: Histogram,
    /// Row order for a clustered heatmap.
    pub order: Vec<usize>,
    pub closest: Vec<ClosePair>,
}

impl ScoreReport {
    /// Builds the report, listing the `top` closest pairs.
    #[must_use]
    pub fn new(cmp: &Comparison, bins: usize, top: usize) -> Self {
        let name = |i: usize| cmp.name_of(i).map_or_else(|| format!("#{i}"), str::to_string);
        let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
        for i in 0..cmp.n {
            for j in i + 1..cmp.n {
                if let Some(d) = cmp.get(i, j).filter(|d| (0.0..=1.0).contains(d)) {
                    pairs.push((i, j, d));
                }
            }
        }

        let minimums: Vec<(String, f64)> = (0..cmp.n)
            .filter(|&i| !cmp.is_prior(i))
            .filter_map(|i| {
                pairs
                    .iter()
                    .filter(|(a, b, _)| *a == i || *b == i)
                    .map(|(_, _, d)| *d)
                    .min_by(f64::total_cmp)
                    .map(|d| (name(i), d))
            })
            .collect();

        let pairwise: Vec<f64> = pairs.iter().map(|(_, _, d)| *d).collect();
        let mins: Vec<f64> = minimums.iter().map(|(_, d)| *d).collect();

        let mut sorted = pairs.clone();
        sorted.sort_by(|x, y| x.2.total_cmp(&y.2).then(x.0.cmp(&y.0)).then(x.1.cmp(&y.1)));
        let closest = sorted
            .into_iter()
            .take(top)
            .map(|(i, j, d)| ClosePair {
                a: name(i),
                b: name(j),
                distance: d,
            })
            .collect();

        let Linkage { order, .. } = single_linkage(cmp);
        Self {
            routine: cmp.routine.clone(),
            metric: cmp.metric.clone(),
            pairwise_histogram: Histogram::new(&pairwise, bins),
            minimum_histogram: Histogram::new(&mins, bins),
            pairwise,
            minimums,
            order,
            closest,
        }
    }

    /// Plain-text rendering: closest pairs, then both histograms.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Similarity: {} ({})", self.routine, self.metric);
        let _ = writeln!(
            out,
            "{} pairs computed, {} clients with a minimum",
            self.pairwise.len(),
            self.minimums.len()
        );
        out.push_str("\nClosest pairs\n");
        for pair in &self.closest {
            let _ = writeln!(out, "  {:.3}  {} / {}", pair.distance, pair.a, pair.b);
        }
        for (title, hist) in [
            ("Pairwise distances", &self.pairwise_histogram),
            ("Minimum distance per client", &self.minimum_histogram),
        ] {
            let _ = writeln!(out, "\n{title}");
            let peak = hist.counts.iter().copied().max().unwrap_or(0).max(1);
            for (idx, count) in hist.counts.iter().enumerate() {
                let bar = "#".repeat(count * 40 / peak);
                let _ = writeln!(out, "  {:>5.2} {count:>5} {bar}", hist.bin_start(idx));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Comparison {
        let mut c = Comparison::new(4, "sub.py", "jaro", Some("old.py"));
        for i in 0..4 {
            c.set_pair(i, i, 0.0);
        }
        c.set_pair(0, 1, 0.2);
        c.set_pair(0, 2, 0.6);
        c.set_pair(1, 2, 3.0);
        c.set_pair(0, 3, 1.0);
        c.set_pair(1, 3, 0.05);
        c.clients = vec!["alice".into(), "bob".into(), "carol".into()];
        c.prior_clients = vec!["zed".into()];
        c
    }

    #[test]
    fn histogram_edges() {
        let h = Histogram::new(&[0.0, 0.05, 0.5, 1.0], 10);
        assert_eq!(h.counts[0], 2);
        assert_eq!(h.counts[5], 1);
        assert_eq!(h.counts[9], 1);
        assert_eq!(h.total(), 4);
    }

    #[test]
    fn minimums_skip_sentinels_and_prior_rows() {
        let r = ScoreReport::new(&sample(), 10, 2);
        assert_eq!(r.pairwise.len(), 4);
        assert_eq!(
            r.minimums,
            vec![
                ("alice".to_string(), 0.2),
                ("bob".to_string(), 0.05),
                ("carol".to_string(), 0.6)
            ]
        );
        assert_eq!(r.closest[0].a, "bob");
        assert_eq!(r.closest[0].b, "zed");
        assert_eq!(r.closest.len(), 2);
        assert!(r.to_text().contains("Closest pairs"));
    }

    #[test]
    fn empty_matrix_reports_nothing() {
        let r = ScoreReport::new(&Comparison::new(0, "f", "moss", None), 10, 5);
        assert!(r.pairwise.is_empty() && r.minimums.is_empty() && r.order.is_empty());
        assert_eq!(r.pairwise_histogram.total(), 0);
    }
}
