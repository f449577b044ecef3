use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Startup-fatal configuration problems. None of these are recoverable.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin} is not valid JSON or TOML: {message}")]
    Parse { origin: String, message: String },

    #[error("perspective '{perspective}' declares unknown searchMode '{mode}'")]
    UnknownSearchMode { perspective: String, mode: String },

    #[error("search perspective '{perspective}' has no searchMode")]
    MissingSearchMode { perspective: String },

    #[error("perspective '{perspective}' is missing required field '{field}'")]
    MissingField { perspective: String, field: String },

    #[error("perspective '{perspective}': page size in '{field}' must be > 0")]
    InvalidPageSize { perspective: String, field: String },

    #[error("perspective '{0}' is configured more than once")]
    DuplicatePerspective(String),
}
