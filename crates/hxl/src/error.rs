//! Error types for the HXL library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for HXL operations.
///
/// Validation findings are never reported through this type; they go to the
/// schema callback as [`crate::validation::ValidationError`] values. `HxlError`
/// covers I/O failures and broken schema configuration.
#[derive(Debug, Error)]
pub enum HxlError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error fetching a remote dataset.
    #[error("HTTP error for '{url}': {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No row of hashtags was found near the top of the input.
    #[error("No HXL hashtag row found in the first {0} rows")]
    NoHashtagRow(usize),

    /// Empty file or no data to read.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A tag pattern or column tagspec could not be parsed.
    #[error("Invalid tag pattern: '{0}'")]
    InvalidTagPattern(String),

    /// Unrecognised datatype name in a schema.
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    /// Unrecognised true/false value in a schema.
    #[error("Unrecognised true/false value: {0}")]
    InvalidBoolean(String),

    /// Malformed number in a schema field.
    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: String, value: String },

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Result type alias for HXL operations.
pub type Result<T> = std::result::Result<T, HxlError>;
