//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors, each field with ordered fallbacks.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Base URL for resolving relative links
    pub base_url: String,

    pub catalog_selectors: CatalogSelectors,

    pub film_selectors: FilmSelectors,

    pub review_selectors: ReviewSelectors,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self::with_base_url(crate::infrastructure::config::letterboxd::BASE_URL)
    }
}

impl ParsingConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            catalog_selectors: CatalogSelectors::default(),
            film_selectors: FilmSelectors::default(),
            review_selectors: ReviewSelectors::default(),
        }
    }
}

/// Selectors for a user's paginated catalog pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSelectors {
    /// One element per watched film
    pub item_container: Vec<String>,

    /// Attributes holding the film link, tried in order on the poster element
    pub link_attributes: Vec<String>,

    /// Attribute holding only the slug (`/film/<slug>/` is built from it)
    pub slug_attribute: String,

    /// Poster element inside an item carrying the link attributes
    pub poster: Vec<String>,

    /// Rating text inside an item
    pub rating: Vec<String>,

    /// Pagination control
    pub pagination: Vec<String>,

    /// "Next page" link inside the pagination control
    pub next_link: Vec<String>,
}

impl Default for CatalogSelectors {
    fn default() -> Self {
        Self {
            item_container: vec![
                "ul.poster-list li.poster-container".to_string(),
                "ul.poster-list > li".to_string(),
                "li.griditem".to_string(),
            ],
            link_attributes: vec!["data-target-link".to_string(), "data-item-link".to_string()],
            slug_attribute: "data-film-slug".to_string(),
            poster: vec![
                "div[data-target-link]".to_string(),
                "div[data-item-link]".to_string(),
                "div[data-film-slug]".to_string(),
            ],
            rating: vec!["span.rating".to_string(), ".poster-viewingdata .rating".to_string()],
            pagination: vec![".pagination".to_string(), ".paginate-nextprev".to_string()],
            next_link: vec!["a.next".to_string(), "a[rel='next']".to_string()],
        }
    }
}

/// Selectors for a film detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilmSelectors {
    /// Open Graph title meta tag
    pub title: Vec<String>,

    /// JSON-LD script block
    pub structured_data: Vec<String>,

    /// Director credit links
    pub directors: Vec<String>,

    /// Headline release year annotation
    pub release_year: Vec<String>,
}

impl Default for FilmSelectors {
    fn default() -> Self {
        Self {
            title: vec!["meta[property='og:title']".to_string()],
            structured_data: vec!["script[type='application/ld+json']".to_string()],
            directors: vec![
                "span.directorlist a.contributor".to_string(),
                "#featured-film-header a[href*='/director/']".to_string(),
                ".credits a[href*='/director/']".to_string(),
            ],
            release_year: vec![
                ".releaseyear a".to_string(),
                "small.number a".to_string(),
                "span.releasedate a".to_string(),
            ],
        }
    }
}

/// Selectors for a user's review page of one film
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSelectors {
    /// Review paragraphs
    pub body: Vec<String>,

    /// Elements carrying a `datetime` attribute
    pub timestamp: Vec<String>,

    /// Diary links whose href encodes `/for/YYYY/MM/DD/`
    pub diary_link: Vec<String>,
}

impl Default for ReviewSelectors {
    fn default() -> Self {
        Self {
            body: vec![
                "div.review.body-text p".to_string(),
                ".review .body-text p".to_string(),
                "div.body-text p".to_string(),
            ],
            timestamp: vec!["time[datetime]".to_string(), "meta[itemprop='dateCreated']".to_string()],
            diary_link: vec![".date-links a[href*='/for/']".to_string(), "a[href*='/diary/films/for/']".to_string()],
        }
    }
}
