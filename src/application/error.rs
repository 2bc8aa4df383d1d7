//! Errors surfaced by the catalog request path
//!
//! Fetch and parse failures never appear here: they are logged and the
//! affected film is skipped or degraded.

use thiserror::Error;

use crate::domain::repositories::StoreError;
use crate::infrastructure::parsing::ParsingError;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cache store failure: {0}")]
    Store(#[from] StoreError),

    #[error("invalid username '{username}': expected letters, digits, '_' or '-'")]
    InvalidUsername { username: String },

    #[error("parser setup failed: {0}")]
    Parser(#[from] ParsingError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Trimmed, lowercased username if it is a plausible Letterboxd handle
///
/// Handles are case-insensitive on the site, so "Alice" and "alice" share
/// one cache row.
pub fn validate_username(raw: &str) -> CatalogResult<String> {
    let username = raw.trim();
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(username.to_ascii_lowercase())
    } else {
        Err(CatalogError::InvalidUsername {
            username: raw.to_string(),
        })
    }
}
