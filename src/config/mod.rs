// src/config/mod.rs
pub mod io;
pub mod types;

pub use self::io::CONFIG_FILE;
pub use self::types::UnicityConfig;
use crate::error::{Result, UnicityError};
use std::path::Path;
use std::time::Duration;

impl UnicityConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `unicity.toml` from `dir` (defaults when absent).
    ///
    /// # Errors
    /// Returns error if the file is unreadable or malformed.
    pub fn load(dir: &Path) -> Result<Self> {
        let config = io::load_from_dir(dir)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration.
    ///
    /// # Errors
    /// Returns error if a value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.fuzzy_threshold > 100 {
            return Err(UnicityError::UnsupportedConfiguration(format!(
                "fuzzy_threshold {} exceeds 100",
                self.fuzzy_threshold
            )));
        }
        if self.workers == 0 {
            return Err(UnicityError::UnsupportedConfiguration(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.python.trim().is_empty() {
            return Err(UnicityError::UnsupportedConfiguration(
                "python interpreter command is empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Saves the current configuration to `unicity.toml` in `dir`.
    ///
    /// # Errors
    /// Returns error if file write fails.
    pub fn save(&self, dir: &Path) -> Result<()> {
        io::save_to_dir(self, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let c = UnicityConfig::default();
        assert_eq!(c.fuzzy_threshold, 75);
        assert_eq!(c.precision, 3);
        assert_eq!(c.workers, 1);
        assert_eq!(c.python, "python3");
        assert!(c.timeout().is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = io::parse_toml("fuzzy_threshold = 80\ntimeout_secs = 2\n").unwrap();
        assert_eq!(c.fuzzy_threshold, 80);
        assert_eq!(c.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(c.diagnostics_file, "similarity_errors.log");
    }

    #[test]
    fn zero_workers_rejected() {
        let c = UnicityConfig {
            workers: 0,
            ..UnicityConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn load_and_save_round_trip() {
        let d = tempfile::tempdir().unwrap();
        let c = UnicityConfig {
            precision: 4,
            ..UnicityConfig::default()
        };
        c.save(d.path()).unwrap();
        assert_eq!(UnicityConfig::load(d.path()).unwrap(), c);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let d = tempfile::tempdir().unwrap();
        assert_eq!(UnicityConfig::load(d.path()).unwrap(), UnicityConfig::default());
    }
}
