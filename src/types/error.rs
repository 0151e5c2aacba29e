//! Error taxonomy for the preprocessing pipeline
//!
//! Structural problems (wrong file kind, impossible segment request, bad
//! configuration) abort the current file; row-level parse failures are
//! recovered locally by dropping the row and never surface here.

use thiserror::Error;

/// Errors that abort processing of the current file or record
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Wrong file kind or signature, or inconsistent per-row date/time cells
    #[error("format error: {0}")]
    Format(String),

    /// Fewer occurrences of the requested protocol state than asked for
    #[error(
        "only {found} occurrence(s) of protocol code {code} found, \
         but occurrence {requested} was requested"
    )]
    SegmentNotFound {
        code: i64,
        found: usize,
        requested: usize,
    },

    /// Unsupported combination method, subject-code mode or protocol name
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required column or metadata field is absent
    #[error("missing data: {0}")]
    MissingData(String),

    /// Underlying file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON summary serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote record store transfer failure
    #[error("remote transfer failed: {0}")]
    Remote(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Remote(err.to_string())
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, PipelineError>;
