//! HTML parsing for Letterboxd catalog, film and review pages
//!
//! Parsers are pure: they take an already fetched document and never touch
//! the network or the store. Each field degrades to an absent or sentinel
//! value on its own, so one malformed block never hides the rest of a page.

pub mod catalog_page_parser;
pub mod config;
pub mod error;
pub mod film_page_parser;
pub mod review_page_parser;

pub use catalog_page_parser::{CatalogItem, CatalogPage, CatalogPageParser};
pub use config::ParsingConfig;
pub use error::{ParsingError, ParsingResult};
pub use film_page_parser::{FilmDetails, FilmPageParser};
pub use review_page_parser::{ReviewDetails, ReviewPageParser};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Compile selector strings, skipping invalid ones; at least one must compile
pub(crate) fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}' for {}: {}", selector_str, field, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() {
        return Err(ParsingError::NoValidSelectors {
            field: field.to_string(),
            errors,
        });
    }

    if !errors.is_empty() {
        debug!("Some {} selectors failed to compile: {}", field, errors.join(", "));
    }

    Ok(selectors)
}

/// Trimmed text of an element with inner whitespace collapsed
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-empty attribute value matched by any selector
pub(crate) fn first_attr(html: &Html, selectors: &[Selector], attr: &str) -> Option<String> {
    selectors.iter().find_map(|selector| {
        html.select(selector)
            .filter_map(|element| element.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(ToString::to_string)
    })
}
