//! Parser for a user's own review page of a film (`/<username>/film/<slug>/`)

#![allow(clippy::uninlined_format_args)]

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::config::{ParsingConfig, ReviewSelectors};
use super::{ParsingError, ParsingResult, compile_selectors, element_text, first_attr};

/// Diary links encode the watch date as `/for/YYYY/MM/DD/`
const DIARY_DATE_PATTERN: &str = r"/for/(\d{4})/(\d{2})/(\d{2})/";

/// Review text and watch date; both absent when the user wrote no review
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDetails {
    pub text: Option<String>,
    /// ISO `YYYY-MM-DD`
    pub date: Option<String>,
}

pub struct ReviewPageParser {
    body_selectors: Vec<Selector>,
    timestamp_selectors: Vec<Selector>,
    diary_link_selectors: Vec<Selector>,
    diary_date: Regex,
}

impl ReviewPageParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ParsingConfig::default())
    }

    pub fn with_config(config: &ParsingConfig) -> ParsingResult<Self> {
        let selectors: &ReviewSelectors = &config.review_selectors;
        let diary_date = Regex::new(DIARY_DATE_PATTERN).map_err(|e| ParsingError::InvalidPattern {
            pattern: DIARY_DATE_PATTERN.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            body_selectors: compile_selectors("review body", &selectors.body)?,
            timestamp_selectors: compile_selectors("review timestamp", &selectors.timestamp)?,
            diary_link_selectors: compile_selectors("diary link", &selectors.diary_link)?,
            diary_date,
        })
    }

    pub fn parse(&self, html_content: &str) -> ReviewDetails {
        let html = Html::parse_document(html_content);
        let details = ReviewDetails {
            text: self.parse_text(&html),
            date: self.parse_date(&html),
        };
        debug!(
            "Review page: text={}, date={:?}",
            details.text.is_some(),
            details.date
        );
        details
    }

    /// Review paragraphs joined by newlines
    pub fn parse_text(&self, html: &Html) -> Option<String> {
        self.body_selectors.iter().find_map(|selector| {
            let paragraphs: Vec<String> = html
                .select(selector)
                .map(|element| element_text(&element))
                .filter(|text| !text.is_empty())
                .collect();
            (!paragraphs.is_empty()).then(|| paragraphs.join("\n"))
        })
    }

    /// `datetime`/`content` of a timestamp element, else the diary link date
    pub fn parse_date(&self, html: &Html) -> Option<String> {
        let from_timestamp = first_attr(html, &self.timestamp_selectors, "datetime")
            .or_else(|| first_attr(html, &self.timestamp_selectors, "content"))
            .and_then(|value| iso_date(value.get(..10)?));

        from_timestamp.or_else(|| {
            self.diary_link_selectors.iter().find_map(|selector| {
                html.select(selector)
                    .filter_map(|link| link.value().attr("href"))
                    .find_map(|href| self.date_from_diary_link(href))
            })
        })
    }

    fn date_from_diary_link(&self, href: &str) -> Option<String> {
        let captures = self.diary_date.captures(href)?;
        iso_date(&format!("{}-{}-{}", &captures[1], &captures[2], &captures[3]))
    }
}

/// Normalized `YYYY-MM-DD` if the text is a real calendar date
fn iso_date(text: &str) -> Option<String> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}
