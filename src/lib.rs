// src/lib.rs
//! Code-similarity and assessment toolkit for cohorts of source-code
//! portfolios.

pub mod config;
pub mod error;
pub mod fuzzy;
pub mod lang;
pub mod parse;
pub mod pool;
pub mod project;
pub mod report;
pub mod roster;
pub mod search;
pub mod similarity;
pub mod source;
pub mod testing;

pub use crate::config::UnicityConfig;
pub use crate::error::{Result, UnicityError};
pub use crate::project::{Client, PortfolioStatus, Project, ProjectOptions, TestStatus};
pub use crate::similarity::{CompareRequest, Comparison, SimilarityEngine};
