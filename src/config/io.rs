// src/config/io.rs
use super::types::UnicityConfig;
use crate::error::{Result, UnicityError};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "unicity.toml";

/// Reads `unicity.toml` from `dir`, falling back to defaults when absent.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_from_dir(dir: &Path) -> Result<UnicityConfig> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(UnicityConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(|e| UnicityError::io(e, &path))?;
    parse_toml(&content)
}

/// Parses a config from toml text.
///
/// # Errors
/// Returns error on malformed toml.
pub fn parse_toml(content: &str) -> Result<UnicityConfig> {
    Ok(toml::from_str(content)?)
}

/// Writes the config as `unicity.toml` into `dir`.
///
/// # Errors
/// Returns error if serialization or the write fails.
pub fn save_to_dir(config: &UnicityConfig, dir: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| UnicityError::UnsupportedConfiguration(e.to_string()))?;
    let path = dir.join(CONFIG_FILE);
    fs::write(&path, content).map_err(|e| UnicityError::io(e, &path))
}
