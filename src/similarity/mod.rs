// src/similarity/mod.rs
//! Pairwise similarity between client portfolios.

pub mod comparison;
pub mod engine;
pub mod metrics;
pub mod selector;

pub use self::comparison::{Comparison, MISSING_ROUTINE, NOT_COMPUTED, PARSE_ERROR};
pub use self::engine::{CompareRequest, SimilarityEngine};
pub use self::metrics::{Metric, MetricRegistry};
pub use self::selector::Selector;
