//! Film detail page parser
//!
//! Each field parser is total: a missing or malformed field turns into the
//! sentinel (title, directors) or `None` (poster, year) and is logged at debug.

#![allow(clippy::uninlined_format_args)]

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::config::{FilmSelectors, ParsingConfig};
use super::{ParsingError, ParsingResult, compile_selectors, element_text, first_attr};
use crate::domain::catalog::{UNKNOWN_TITLE, unknown_directors};

/// Fields scraped from one film page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilmDetails {
    pub title: String,
    pub poster_url: Option<String>,
    pub directors: Vec<String>,
    pub release_year: Option<String>,
}

pub struct FilmPageParser {
    title_selectors: Vec<Selector>,
    structured_data_selectors: Vec<Selector>,
    director_selectors: Vec<Selector>,
    release_year_selectors: Vec<Selector>,
}

impl FilmPageParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ParsingConfig::default())
    }

    pub fn with_config(config: &ParsingConfig) -> ParsingResult<Self> {
        let selectors: &FilmSelectors = &config.film_selectors;
        Ok(Self {
            title_selectors: compile_selectors("title", &selectors.title)?,
            structured_data_selectors: compile_selectors("structured data", &selectors.structured_data)?,
            director_selectors: compile_selectors("directors", &selectors.directors)?,
            release_year_selectors: compile_selectors("release year", &selectors.release_year)?,
        })
    }

    /// All fields of a fetched film page
    pub fn parse(&self, html_content: &str) -> FilmDetails {
        let html = Html::parse_document(html_content);
        let structured = self.structured_data(&html);

        FilmDetails {
            title: self.parse_title(&html),
            poster_url: structured.as_ref().and_then(poster_from_structured_data),
            directors: self.parse_directors(&html),
            release_year: self
                .headline_year(&html)
                .or_else(|| structured.as_ref().and_then(year_from_structured_data)),
        }
    }

    /// Open Graph title, or "Unknown Title"
    pub fn parse_title(&self, html: &Html) -> String {
        first_attr(html, &self.title_selectors, "content").unwrap_or_else(|| {
            debug!("No og:title, using sentinel title");
            UNKNOWN_TITLE.to_string()
        })
    }

    /// `image` of the JSON-LD block
    pub fn parse_poster_url(&self, html: &Html) -> Option<String> {
        self.structured_data(html).as_ref().and_then(poster_from_structured_data)
    }

    /// Director credits in page order, or `["Unknown Director"]`
    pub fn parse_directors(&self, html: &Html) -> Vec<String> {
        for selector in &self.director_selectors {
            let mut directors: Vec<String> = Vec::new();
            for name in html.select(selector).map(|element| element_text(&element)) {
                if !name.is_empty() && !directors.contains(&name) {
                    directors.push(name);
                }
            }
            if !directors.is_empty() {
                return directors;
            }
        }

        debug!("No director credits, using sentinel");
        unknown_directors()
    }

    /// Headline year, then the first four characters of `datePublished`
    pub fn parse_release_year(&self, html: &Html) -> Option<String> {
        self.headline_year(html)
            .or_else(|| self.structured_data(html).as_ref().and_then(year_from_structured_data))
    }

    fn headline_year(&self, html: &Html) -> Option<String> {
        self.release_year_selectors.iter().find_map(|selector| {
            html.select(selector)
                .map(|element| element_text(&element))
                .find_map(|text| four_digit_year(&text))
        })
    }

    fn structured_data(&self, html: &Html) -> Option<Value> {
        let raw = self.structured_data_selectors.iter().find_map(|selector| {
            html.select(selector)
                .map(|element| element.text().collect::<String>())
                .find(|text| !text.trim().is_empty())
        })?;

        match parse_structured_data(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring structured data: {}", e);
                None
            }
        }
    }
}

/// Decode a JSON-LD payload, dropping `/* ... */` wrapping around it
fn parse_structured_data(raw: &str) -> ParsingResult<Value> {
    let mut text = raw.trim();
    if text.starts_with("/*") {
        text = text.split_once("*/").map_or("", |(_, rest)| rest).trim();
        text = text.split_once("/*").map_or(text, |(json, _)| json).trim();
    }

    serde_json::from_str(text).map_err(|e| ParsingError::InvalidStructuredData { reason: e.to_string() })
}

fn poster_from_structured_data(data: &Value) -> Option<String> {
    let image = match data.get("image")? {
        Value::String(url) => Some(url.as_str()),
        Value::Array(images) => images.iter().find_map(Value::as_str),
        Value::Object(object) => object.get("url").and_then(Value::as_str),
        _ => None,
    }?;

    let image = image.trim();
    (!image.is_empty()).then(|| image.to_string())
}

fn year_from_structured_data(data: &Value) -> Option<String> {
    let published = data.get("datePublished").and_then(Value::as_str);
    let released = data
        .get("releasedEvent")
        .and_then(|events| events.get(0))
        .and_then(|event| event.get("startDate"))
        .and_then(Value::as_str);

    published.into_iter().chain(released).find_map(four_digit_year)
}

/// First four characters when they are all ASCII digits
fn four_digit_year(text: &str) -> Option<String> {
    let text = text.trim();
    let year = text.get(..4)?;
    year.chars().all(|c| c.is_ascii_digit()).then(|| year.to_string())
}
