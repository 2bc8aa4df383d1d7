//! Catalog data model: watched-film entries and the per-user cache record

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Stored when a film page carries no parseable title
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Stored as the sole director when the credits block is missing or empty
pub const UNKNOWN_DIRECTOR: &str = "Unknown Director";

/// One watched-film record scraped from a user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    /// Film page URL; identifies the entry within one user's catalog
    pub source_url: String,
    pub poster_url: Option<String>,
    /// Star-rating symbols as shown on the profile (e.g. "★★★½")
    pub rating: Option<String>,
    pub directors: Vec<String>,
    pub review: Option<String>,
    pub release_year: Option<String>,
    /// ISO date (YYYY-MM-DD)
    pub review_date: Option<String>,
    pub review_url: Option<String>,
}

impl CatalogEntry {
    /// Entry carrying only the identifying URL and sentinel values
    pub fn placeholder(source_url: impl Into<String>) -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            source_url: source_url.into(),
            poster_url: None,
            rating: None,
            directors: unknown_directors(),
            review: None,
            release_year: None,
            review_date: None,
            review_url: None,
        }
    }

    pub fn has_unknown_title(&self) -> bool {
        self.title == UNKNOWN_TITLE
    }

    pub fn has_unknown_directors(&self) -> bool {
        self.directors.len() == 1 && self.directors[0] == UNKNOWN_DIRECTOR
    }
}

/// `["Unknown Director"]`
pub fn unknown_directors() -> Vec<String> {
    vec![UNKNOWN_DIRECTOR.to_string()]
}

/// One cached catalog per username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCacheRecord {
    pub username: String,
    /// Newest-first, in scrape order
    pub entries: Vec<CatalogEntry>,
    /// Epoch seconds of the last successful refresh
    pub last_updated: i64,
    /// Set once a walk reached the end of the catalog without truncation
    pub is_complete: bool,
}

impl UserCacheRecord {
    pub fn new(username: impl Into<String>, entries: Vec<CatalogEntry>, last_updated: i64, is_complete: bool) -> Self {
        Self {
            username: username.into(),
            entries,
            last_updated,
            is_complete,
        }
    }

    /// Most recent entry, used as the cheap change probe
    pub fn head(&self) -> Option<&CatalogEntry> {
        self.entries.first()
    }

    pub fn head_url(&self) -> Option<&str> {
        self.head().map(|e| e.source_url.as_str())
    }

    pub fn source_urls(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.source_url.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `source_url -> rating`, rebuilt on every scrape pass and never stored on its own
pub type RatingIndex = HashMap<String, String>;
