//! Forward walk over a user's catalog pages
//!
//! Starts at the newest-first catalog page and follows "next" links. A walk
//! ends on the first page with no items, a page with no next link, the page
//! cap, the optional item limit, or a page that could not be fetched.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::catalog::RatingIndex;
use crate::infrastructure::config::utils::catalog_url;
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing::CatalogPageParser;

/// Why a walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStop {
    /// Empty page or no next link
    EndOfCatalog,
    PageCap,
    ItemLimit,
    /// A catalog page failed after retries; items gathered so far are kept
    FetchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogWalk {
    /// Film URLs in catalog order, newest watch first, without repeats
    pub urls: Vec<String>,
    /// Ratings of the walked films that show one
    pub ratings: RatingIndex,
    pub pages_fetched: u32,
    pub stop: WalkStop,
}

impl CatalogWalk {
    pub fn reached_end(&self) -> bool {
        self.stop == WalkStop::EndOfCatalog
    }

    /// Nothing could be fetched, not even the first page
    pub fn is_unavailable(&self) -> bool {
        self.pages_fetched == 0
    }

    pub fn head(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

pub struct CatalogWalker {
    fetcher: Arc<dyn PageFetcher>,
    parser: CatalogPageParser,
    base_url: String,
}

impl CatalogWalker {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: CatalogPageParser, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            parser,
            base_url: base_url.into(),
        }
    }

    /// Walk up to `max_pages` pages, stopping early once `limit` URLs are collected
    pub async fn walk(&self, username: &str, max_pages: u32, limit: Option<usize>) -> CatalogWalk {
        let mut walk = CatalogWalk {
            urls: Vec::new(),
            ratings: RatingIndex::new(),
            pages_fetched: 0,
            stop: WalkStop::PageCap,
        };
        if limit == Some(0) {
            walk.stop = WalkStop::ItemLimit;
            return walk;
        }

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut visited_pages: HashSet<String> = HashSet::new();
        let mut next_url = Some(catalog_url(&self.base_url, username));

        while let Some(page_url) = next_url.take() {
            if walk.pages_fetched >= max_pages {
                walk.stop = WalkStop::PageCap;
                break;
            }
            if !visited_pages.insert(page_url.clone()) {
                warn!("Catalog page {} links back to an earlier page, stopping", page_url);
                walk.stop = WalkStop::EndOfCatalog;
                break;
            }

            let body = match self.fetcher.fetch_page(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Stopping catalog walk for {} at page {}: {}", username, walk.pages_fetched + 1, e);
                    walk.stop = WalkStop::FetchFailed;
                    break;
                }
            };
            walk.pages_fetched += 1;

            let page = self.parser.parse(&body);
            if page.is_empty() {
                debug!("Page {} of {} has no items, end of catalog", walk.pages_fetched, username);
                walk.stop = WalkStop::EndOfCatalog;
                break;
            }

            for item in page.items {
                if !seen_urls.insert(item.source_url.clone()) {
                    continue;
                }
                if let Some(rating) = item.rating {
                    walk.ratings.insert(item.source_url.clone(), rating);
                }
                walk.urls.push(item.source_url);

                if limit.is_some_and(|n| walk.urls.len() >= n) {
                    walk.stop = WalkStop::ItemLimit;
                    return walk;
                }
            }

            match page.next_page_url {
                Some(url) => next_url = Some(url),
                None => walk.stop = WalkStop::EndOfCatalog,
            }
        }

        info!(
            "Walked {} catalog pages for {}: {} films, {} rated, stop={:?}",
            walk.pages_fetched,
            username,
            walk.urls.len(),
            walk.ratings.len(),
            walk.stop
        );
        walk
    }

    /// Every film URL within the page cap
    pub async fn walk_catalog(&self, username: &str, max_pages: u32) -> Vec<String> {
        self.walk(username, max_pages, None).await.urls
    }

    /// The `n` most recent film URLs
    pub async fn walk_latest(&self, username: &str, n: usize, max_pages: u32) -> Vec<String> {
        self.walk(username, max_pages, Some(n)).await.urls
    }

    pub async fn walk_ratings(&self, username: &str, max_pages: u32) -> RatingIndex {
        self.walk(username, max_pages, None).await.ratings
    }
}
