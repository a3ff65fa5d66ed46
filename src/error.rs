//! Custom error types for paperlens.
//!
//! This module defines all error types used throughout the library.
//! All fallible functions return `Result<T, PaperlensError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for paperlens operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum PaperlensError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (CITATION.cff) parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Spreadsheet encoding error
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error (bad user input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested row or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Citation metadata has not been loaded (yet)
    #[error("Citation not loaded yet.")]
    CitationNotLoaded,
}

/// Result type alias using `PaperlensError`
pub type Result<T> = std::result::Result<T, PaperlensError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a not-found error message
    fn ok_or_not_found(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, what: &str) -> Result<T> {
        self.ok_or_else(|| PaperlensError::NotFound(what.to_string()))
    }
}
