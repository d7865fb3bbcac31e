// src/roster.rs
//! Cohort roster loaded from CSV.
//!
//! A header row is required and must contain a `name` column. Every other
//! column becomes a per-client attribute. A column whose values all parse as
//! integers is typed `Int`; failing that, a column whose values all parse as
//! floats is typed `Float`, narrowed to `Int` when every value is integral.
//! Anything else stays `Text`. Empty cells are `Missing` and do not affect
//! the column type.

use crate::error::{Result, UnicityError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Float,
    Text,
}

/// Client name to attribute columns, in file order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Roster {
    pub columns: Vec<String>,
    entries: BTreeMap<String, BTreeMap<String, AttrValue>>,
}

impl Roster {
    /// Loads a roster file.
    ///
    /// # Errors
    /// Returns error if the file is unreadable, is not CSV, or lacks a
    /// `name` column.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| UnicityError::io(e, path))?;
        Self::from_reader(file)
    }

    /// # Errors
    /// Returns error if the input is not CSV or lacks a `name` column.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);
        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        let Some(name_idx) = headers.iter().position(|h| h == "name") else {
            return Err(UnicityError::Csv(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "roster has no 'name' column",
            ))));
        };

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in csv.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != name_idx)
            .map(|(_, h)| h.clone())
            .collect();
        let types: Vec<(usize, ColumnType)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != name_idx)
            .map(|(i, _)| (i, column_type(rows.iter().filter_map(|r| r.get(i)))))
            .collect();

        let mut entries = BTreeMap::new();
        for row in &rows {
            let Some(name) = row.get(name_idx).filter(|n| !n.is_empty()) else {
                continue;
            };
            let attrs = types
                .iter()
                .map(|&(i, ty)| {
                    let raw = row.get(i).map_or("", String::as_str);
                    (headers[i].clone(), convert(raw, ty))
                })
                .collect();
            if entries.insert(name.clone(), attrs).is_some() {
                tracing::warn!(client = %name, "duplicate roster row; keeping the last");
            }
        }
        tracing::debug!(clients = entries.len(), "roster loaded");
        Ok(Self { columns, entries })
    }

    /// Roster from bare names, without attributes.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Vec::new(),
            entries: names.into_iter().map(|n| (n.into(), BTreeMap::new())).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn attributes(&self, name: &str) -> Option<&BTreeMap<String, AttrValue>> {
        self.entries.get(name)
    }

    /// Sorted client names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn column_type<'a>(values: impl Iterator<Item = &'a String>) -> ColumnType {
    let present: Vec<&str> = values.map(String::as_str).filter(|v| !v.is_empty()).collect();
    if present.is_empty() {
        return ColumnType::Text;
    }
    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        return ColumnType::Int;
    }
    let floats: Option<Vec<f64>> = present.iter().map(|v| v.parse::<f64>().ok()).collect();
    match floats {
        Some(fs) if fs.iter().all(|f| is_lossless_int(*f)) => ColumnType::Int,
        Some(_) => ColumnType::Float,
        None => ColumnType::Text,
    }
}

#[allow(clippy::cast_precision_loss)]
fn is_lossless_int(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64
}

#[allow(clippy::cast_possible_truncation)]
fn convert(raw: &str, ty: ColumnType) -> AttrValue {
    if raw.is_empty() {
        return AttrValue::Missing;
    }
    match ty {
        ColumnType::Int => raw
            .parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(|f| f as i64))
            .map_or_else(|| AttrValue::Text(raw.to_string()), AttrValue::Int),
        ColumnType::Float => raw
            .parse::<f64>()
            .map_or_else(|_| AttrValue::Text(raw.to_string()), AttrValue::Float),
        ColumnType::Text => AttrValue::Text(raw.to_string()),
    }
}
