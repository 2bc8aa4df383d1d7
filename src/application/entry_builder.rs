//! Turns new film URLs into catalog entries
//!
//! Films are processed in order, in fixed-size batches with a pause between
//! batches. A film page that cannot be fetched is skipped; a review page that
//! cannot be fetched leaves the review fields empty.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::catalog::{CatalogEntry, RatingIndex};
use crate::infrastructure::config::utils::{film_slug, review_url};
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing::{FilmPageParser, ReviewDetails, ReviewPageParser};

/// Batch size and pause between batches
#[derive(Debug, Clone, Copy)]
pub struct BatchPlan {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

pub struct EntryBuilder {
    fetcher: Arc<dyn PageFetcher>,
    film_parser: FilmPageParser,
    review_parser: ReviewPageParser,
    base_url: String,
    fetch_reviews: bool,
}

impl EntryBuilder {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        film_parser: FilmPageParser,
        review_parser: ReviewPageParser,
        base_url: impl Into<String>,
        fetch_reviews: bool,
    ) -> Self {
        Self {
            fetcher,
            film_parser,
            review_parser,
            base_url: base_url.into(),
            fetch_reviews,
        }
    }

    /// Entries for `urls` in input order, minus films whose page failed
    pub async fn build_all(
        &self,
        username: &str,
        urls: &[String],
        ratings: &RatingIndex,
        plan: BatchPlan,
    ) -> Vec<CatalogEntry> {
        let mut entries = Vec::with_capacity(urls.len());
        let batch_count = urls.len().div_ceil(plan.batch_size.max(1));

        for (batch_index, batch) in urls.chunks(plan.batch_size.max(1)).enumerate() {
            if batch_index > 0 && !plan.batch_delay.is_zero() {
                tokio::time::sleep(plan.batch_delay).await;
            }
            debug!("Processing batch {}/{} for {}", batch_index + 1, batch_count, username);

            for url in batch {
                if let Some(entry) = self.build(username, url, ratings).await {
                    entries.push(entry);
                }
            }
        }

        if entries.len() < urls.len() {
            warn!(
                "Built {} of {} entries for {}; {} films skipped",
                entries.len(),
                urls.len(),
                username,
                urls.len() - entries.len()
            );
        } else {
            info!("Built {} entries for {}", entries.len(), username);
        }
        entries
    }

    /// One entry, or `None` if the film page could not be fetched
    pub async fn build(&self, username: &str, source_url: &str, ratings: &RatingIndex) -> Option<CatalogEntry> {
        let body = match self.fetcher.fetch_page(source_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Skipping film {}: {}", source_url, e);
                return None;
            }
        };
        let film = self.film_parser.parse(&body);

        let review_url = film_slug(source_url).map(|slug| review_url(&self.base_url, username, slug));
        let review = match &review_url {
            Some(url) if self.fetch_reviews => self.fetch_review(url).await,
            _ => ReviewDetails::default(),
        };

        Some(CatalogEntry {
            title: film.title,
            source_url: source_url.to_string(),
            poster_url: film.poster_url,
            rating: ratings.get(source_url).cloned(),
            directors: film.directors,
            review: review.text,
            release_year: film.release_year,
            review_date: review.date,
            review_url,
        })
    }

    async fn fetch_review(&self, url: &str) -> ReviewDetails {
        match self.fetcher.fetch_page(url).await {
            Ok(body) => self.review_parser.parse(&body),
            Err(e) => {
                debug!("No review at {}: {}", url, e);
                ReviewDetails::default()
            }
        }
    }
}
