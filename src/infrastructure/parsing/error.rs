//! Parsing error types
//!
//! These never leave the parser modules as errors: the public field parsers
//! turn them into absent or sentinel values after logging.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing { field: String },

    #[error("No valid selectors for {field}: {}", errors.join(", "))]
    NoValidSelectors { field: String, errors: Vec<String> },

    #[error("Structured data block is not valid JSON: {reason}")]
    InvalidStructuredData { reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed { url: String, reason: String },
}

impl ParsingError {
    pub fn required_field_missing(field: &str) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
