// src/report/mod.rs
//! Cohort summaries and similarity score reports.

pub mod cluster;
pub mod scores;
pub mod summary;
pub mod terminal;

pub use self::cluster::{single_linkage, Linkage, Merge};
pub use self::scores::{ClosePair, Histogram, ScoreReport, DEFAULT_BINS};
pub use self::summary::{PartialEntry, Summary};
pub use self::terminal::print_summary;
