//! Parser for a user's paginated catalog ("films by date") pages
//!
//! One page yields the film links in page order, the user's star rating for
//! each film when shown, and the absolute URL of the next page if the
//! pagination control has one.

#![allow(clippy::uninlined_format_args)]

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::config::{CatalogSelectors, ParsingConfig};
use super::{ParsingError, ParsingResult, compile_selectors, element_text};

/// One film tile on a catalog page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub source_url: String,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub next_page_url: Option<String>,
}

impl CatalogPage {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct CatalogPageParser {
    base_url: Url,
    container_selectors: Vec<Selector>,
    poster_selectors: Vec<Selector>,
    rating_selectors: Vec<Selector>,
    pagination_selectors: Vec<Selector>,
    next_link_selectors: Vec<Selector>,
    link_attributes: Vec<String>,
    slug_attribute: String,
}

impl CatalogPageParser {
    /// Parser with default selectors against the production site
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ParsingConfig::default())
    }

    pub fn with_config(config: &ParsingConfig) -> ParsingResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ParsingError::UrlResolutionFailed {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        let selectors: &CatalogSelectors = &config.catalog_selectors;

        Ok(Self {
            base_url,
            container_selectors: compile_selectors("catalog item", &selectors.item_container)?,
            poster_selectors: compile_selectors("catalog poster", &selectors.poster)?,
            rating_selectors: compile_selectors("catalog rating", &selectors.rating)?,
            pagination_selectors: compile_selectors("pagination", &selectors.pagination)?,
            next_link_selectors: compile_selectors("next page link", &selectors.next_link)?,
            link_attributes: selectors.link_attributes.clone(),
            slug_attribute: selectors.slug_attribute.clone(),
        })
    }

    /// Parse a fetched catalog page
    pub fn parse(&self, html_content: &str) -> CatalogPage {
        let html = Html::parse_document(html_content);
        let items = self.parse_items(&html);
        let next_page_url = self.parse_next_page(&html);

        debug!(
            "Catalog page: {} items, next page: {}",
            items.len(),
            next_page_url.as_deref().unwrap_or("none")
        );

        CatalogPage { items, next_page_url }
    }

    /// Items from the first container selector that matches anything
    fn parse_items(&self, html: &Html) -> Vec<CatalogItem> {
        for selector in &self.container_selectors {
            let containers: Vec<ElementRef> = html.select(selector).collect();
            if containers.is_empty() {
                continue;
            }

            let mut items: Vec<CatalogItem> = Vec::with_capacity(containers.len());
            for (index, container) in containers.iter().enumerate() {
                match self.extract_item(container) {
                    Ok(item) if !items.iter().any(|seen| seen.source_url == item.source_url) => items.push(item),
                    Ok(item) => debug!("Skipping repeated tile {}", item.source_url),
                    Err(e) => warn!("Skipping catalog tile {}: {}", index, e),
                }
            }
            return items;
        }

        Vec::new()
    }

    fn extract_item(&self, container: &ElementRef) -> ParsingResult<CatalogItem> {
        let href = self
            .item_link(container)
            .ok_or_else(|| ParsingError::required_field_missing("film link"))?;
        let source_url = self.resolve(&href)?;

        let rating = self
            .rating_selectors
            .iter()
            .find_map(|selector| container.select(selector).next())
            .map(|element| element_text(&element))
            .filter(|text| !text.is_empty());

        Ok(CatalogItem { source_url, rating })
    }

    /// Link attribute on the container itself or its poster element; a bare slug becomes `/film/<slug>/`
    fn item_link(&self, container: &ElementRef) -> Option<String> {
        let candidates = std::iter::once(*container).chain(
            self.poster_selectors
                .iter()
                .filter_map(|selector| container.select(selector).next()),
        );

        for element in candidates {
            let value = element.value();
            if let Some(link) = self
                .link_attributes
                .iter()
                .filter_map(|attr| value.attr(attr))
                .map(str::trim)
                .find(|link| !link.is_empty())
            {
                return Some(link.to_string());
            }
            if let Some(slug) = value.attr(&self.slug_attribute).map(str::trim).filter(|s| !s.is_empty()) {
                return Some(format!("/film/{}/", slug));
            }
        }

        None
    }

    /// Next-page link inside the pagination control; absent control means last page
    fn parse_next_page(&self, html: &Html) -> Option<String> {
        let control = self
            .pagination_selectors
            .iter()
            .find_map(|selector| html.select(selector).next())?;

        let href = self
            .next_link_selectors
            .iter()
            .find_map(|selector| control.select(selector).next())
            .and_then(|link| link.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())?;

        match self.resolve(href) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Ignoring next page link: {}", e);
                None
            }
        }
    }

    fn resolve(&self, href: &str) -> ParsingResult<String> {
        self.base_url
            .join(href)
            .map(String::from)
            .map_err(|e| ParsingError::UrlResolutionFailed {
                url: href.to_string(),
                reason: e.to_string(),
            })
    }
}
