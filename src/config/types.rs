// src/config/types.rs
use serde::{Deserialize, Serialize};

/// Tunables for ingest, analysis and output.
///
/// Every field has a serde default so a partial `unicity.toml` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnicityConfig {
    /// Minimum fuzzy ratio (0-100) for a filename to claim an expected slot.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: u8,
    /// Decimals written per distance in comparison files.
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Interpreter command used by the test runner.
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_diagnostics_file")]
    pub diagnostics_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_file: Option<String>,
}

impl Default for UnicityConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            precision: default_precision(),
            workers: default_workers(),
            python: default_python(),
            timeout_secs: None,
            diagnostics_file: default_diagnostics_file(),
            search_file: None,
        }
    }
}

const fn default_fuzzy_threshold() -> u8 { 75 }
const fn default_precision() -> usize { 3 }
const fn default_workers() -> usize { 1 }
fn default_python() -> String { "python3".to_string() }
fn default_diagnostics_file() -> String { "similarity_errors.log".to_string() }
