//! Error types for sheet rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Errors callers branch on: fatal startup conditions versus per-record failures.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Record value for '{id}' must be a string, number or boolean")]
    InvalidRecordValue { id: String },
    #[error("No usable font found (tried: {0})")]
    FontNotFound(String),
    #[error("Failed to load font from {}: {message}", .path.display())]
    FontLoad { path: PathBuf, message: String },
    #[error("PDF error: {0}")]
    Pdf(String),
}

impl From<lopdf::Error> for SheetError {
    fn from(e: lopdf::Error) -> Self {
        SheetError::Pdf(e.to_string())
    }
}

impl SheetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SheetError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(origin: impl Into<String>, source: serde_json::Error) -> Self {
        SheetError::Json {
            origin: origin.into(),
            source,
        }
    }
}
