// src/similarity/comparison.rs
//! The distance matrix and its on-disk formats.
//!
//! Text format:
//!
//! ```text
//! <N> <routine> <metric> [<prior routine>]
//! d11 d12 ... d1N
//! ...
//! dN1 dN2 ... dNN
//! ```

use crate::error::{Result, UnicityError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

pub const PARSE_ERROR: f64 = 2.0;
pub const MISSING_ROUTINE: f64 = 3.0;
/// Metric failure, and the initial value of every cell.
pub const NOT_COMPUTED: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub n: usize,
    /// Row-major `n * n`.
    pub matrix: Vec<f64>,
    pub routine: String,
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_routine: Option<String>,
    /// Current-cohort names, then prior-cohort names. Empty when loaded
    /// from the text format.
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub prior_clients: Vec<String>,
}

impl Comparison {
    /// An `n * n` matrix of `NOT_COMPUTED`.
    #[must_use]
    pub fn new(n: usize, routine: &str, metric: &str, prior_routine: Option<&str>) -> Self {
        Self {
            n,
            matrix: vec![NOT_COMPUTED; n * n],
            routine: routine.to_string(),
            metric: metric.to_string(),
            prior_routine: prior_routine.map(str::to_string),
            clients: Vec::new(),
            prior_clients: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.n && j < self.n {
            self.matrix.get(i * self.n + j).copied()
        } else {
            None
        }
    }

    /// Writes `value` at `(i, j)` and `(j, i)`.
    pub fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        if i < self.n && j < self.n {
            let n = self.n;
            self.matrix[i * n + j] = value;
            self.matrix[j * n + i] = value;
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.matrix.chunks(self.n.max(1))
    }

    /// Index of a client by name across both cohorts.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.clients
            .iter()
            .chain(self.prior_clients.iter())
            .position(|c| c == name)
    }

    #[must_use]
    pub fn name_of(&self, idx: usize) -> Option<&str> {
        self.clients
            .iter()
            .chain(self.prior_clients.iter())
            .nth(idx)
            .map(String::as_str)
    }

    /// True if `idx` belongs to the prior cohort.
    #[must_use]
    pub fn is_prior(&self, idx: usize) -> bool {
        !self.prior_clients.is_empty() && idx >= self.n.saturating_sub(self.prior_clients.len())
    }

    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        (0..self.n).all(|i| (0..i).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// Text form with `precision` decimals.
    #[must_use]
    pub fn to_text(&self, precision: usize) -> String {
        let mut out = format!("{} {} {}", self.n, self.routine, self.metric);
        if let Some(prior) = &self.prior_routine {
            let _ = write!(out, " {prior}");
        }
        out.push('\n');
        if self.n == 0 {
            return out;
        }
        for row in self.rows() {
            let cells: Vec<String> = row.iter().map(|d| format!("{d:.precision$}")).collect();
            out.push_str(&cells.join(" "));
            out.push('\n');
        }
        out
    }

    /// # Errors
    /// Returns `ComparisonFormat` on a bad header, row count, or number.
    pub fn from_text(text: &str) -> Result<Self> {
        let bad = |msg: String| UnicityError::ComparisonFormat(msg);
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| bad("empty input".into()))?;
        let fields: Vec<&str> = header.split_whitespace().collect();
        if !(3..=4).contains(&fields.len()) {
            return Err(bad(format!("header has {} fields: '{header}'", fields.len())));
        }
        let n: usize = fields[0]
            .parse()
            .map_err(|_| bad(format!("bad size '{}'", fields[0])))?;
        let mut cmp = Self::new(n, fields[1], fields[2], fields.get(3).copied());

        let mut row_count = 0;
        for (i, line) in lines.enumerate() {
            if i >= n {
                return Err(bad(format!("more than {n} rows")));
            }
            let values: Vec<&str> = line.split_whitespace().collect();
            if values.len() != n {
                return Err(bad(format!("row {} has {} values, expected {n}", i + 1, values.len())));
            }
            for (j, v) in values.iter().enumerate() {
                cmp.matrix[i * n + j] = v
                    .parse()
                    .map_err(|_| bad(format!("bad number '{v}' in row {}", i + 1)))?;
            }
            row_count += 1;
        }
        if row_count != n {
            return Err(bad(format!("expected {n} rows, found {row_count}")));
        }
        Ok(cmp)
    }

    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: &Path, precision: usize) -> Result<()> {
        std::fs::write(path, self.to_text(precision)).map_err(|e| UnicityError::io(e, path))
    }

    /// # Errors
    /// Returns error if the file is unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| UnicityError::io(e, path))?;
        Self::from_text(&text)
    }

    /// # Errors
    /// Returns error if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    /// Returns error on malformed JSON or a matrix of the wrong size.
    pub fn from_json(text: &str) -> Result<Self> {
        let cmp: Self = serde_json::from_str(text)?;
        if cmp.matrix.len() != cmp.n * cmp.n {
            return Err(UnicityError::ComparisonFormat(format!(
                "matrix has {} cells for n = {}",
                cmp.matrix.len(),
                cmp.n
            )));
        }
        Ok(cmp)
    }
}

/// Rounds to `precision` decimals so the text form reloads exactly.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn round_to(value: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision.min(15) as i32);
    (value * scale).round() / scale
}
