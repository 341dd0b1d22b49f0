//! Custom error types for litsurvey.
//!
//! This module defines all error types used throughout the library.
//! All functions return `Result<T, SurveyError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for litsurvey operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Feed or model response parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code from API
        code: i32,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// PDF/Word serialization error
    #[error("Export error: {0}")]
    Export(String),

    /// The fetch returned nothing to summarize
    #[error("No papers found.")]
    NoPapers,
}

/// Result type alias using `SurveyError`
pub type Result<T> = std::result::Result<T, SurveyError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| SurveyError::Parse(msg.to_string()))
    }
}
