// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnicityError {
    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Not a directory or a readable zip archive: {0}")]
    InvalidProjectSource(PathBuf),

    #[error("Author '{author}' of entry '{entry}' is not in the cohort roster")]
    UnknownAuthor { author: String, entry: String },

    #[error("Unexpected file '{entry}' from '{author}': matches no expected file (best: '{best}' at {score}) and no ignore pattern")]
    UnexpectedFile {
        author: String,
        entry: String,
        best: String,
        score: u8,
    },

    #[error("Unit test '{0}' does not import from any expected client module")]
    NoClientImport(String),

    #[error("No routine named '{0}'")]
    UnknownRoutine(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Invalid routine selector '{0}'")]
    InvalidSelector(String),

    #[error("Selector '{0}' matches no expected file")]
    EmptySelection(String),

    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("No parser registered for expected file '{0}'")]
    UnknownParser(String),

    #[error("Dependency closure for '{0}' did not converge")]
    ClosureDepth(String),

    #[error("Malformed comparison file: {0}")]
    ComparisonFormat(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Roster error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Glob(#[from] globset::Error),
}

pub type Result<T> = std::result::Result<T, UnicityError>;

impl UnicityError {
    /// Attaches a path to an I/O error.
    #[must_use]
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        UnicityError::Io {
            source,
            path: path.into(),
        }
    }
}

// Allow `?` on std::io::Error by converting to UnicityError::Io with unknown path.
impl From<std::io::Error> for UnicityError {
    fn from(source: std::io::Error) -> Self {
        UnicityError::Io {
            source,
            path: PathBuf::from("<unknown>"),
        }
    }
}

// Walk failures surface as I/O errors on the offending path
impl From<walkdir::Error> for UnicityError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("<unknown>"));
        let source = e
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
        UnicityError::Io { source, path }
    }
}
