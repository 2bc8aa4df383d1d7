//! Freshness verdicts and the incremental merge rule
//!
//! A catalog request is classified as one of four states:
//! - `Fresh`: cache younger than the TTL, served verbatim
//! - `StaleSameHead`: TTL exceeded but the live head matches the cached head
//! - `StaleRebuild`: TTL exceeded and the head moved, could not be probed, or
//!   the previous pass stopped before the end of the catalog
//! - `NoCache`: nothing stored yet
//!
//! Everything here is pure; the service layer supplies clock readings and
//! probe results.

use std::collections::HashSet;

use super::catalog::{CatalogEntry, UserCacheRecord};

/// Default cache time-to-live (six hours)
pub const DEFAULT_TTL_SECONDS: i64 = 21_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessState {
    Fresh,
    StaleSameHead,
    StaleRebuild,
    NoCache,
}

impl FreshnessState {
    pub fn requires_scrape(self) -> bool {
        matches!(self, Self::StaleRebuild | Self::NoCache)
    }
}

/// Outcome of the clock-only part of the assessment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    Decided(FreshnessState),
    /// Stale cache with a head entry: the live head must be fetched before deciding
    ProbeHead { cached_head: String },
}

#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    pub ttl_seconds: i64,
    pub head_probe_enabled: bool,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            head_probe_enabled: true,
        }
    }
}

impl FreshnessPolicy {
    pub fn new(ttl_seconds: i64, head_probe_enabled: bool) -> Self {
        Self {
            ttl_seconds,
            head_probe_enabled,
        }
    }

    /// Strictly younger than the TTL. An age of exactly `ttl_seconds` is stale.
    pub fn is_fresh(&self, last_updated: i64, now: i64) -> bool {
        now.saturating_sub(last_updated) < self.ttl_seconds
    }

    pub fn assess(&self, record: Option<&UserCacheRecord>, now: i64) -> Assessment {
        let Some(record) = record else {
            return Assessment::Decided(FreshnessState::NoCache);
        };

        if self.is_fresh(record.last_updated, now) {
            return Assessment::Decided(FreshnessState::Fresh);
        }

        // An unchanged head says nothing about films a capped pass left behind
        match record.head_url() {
            Some(head) if self.head_probe_enabled && record.is_complete => Assessment::ProbeHead {
                cached_head: head.to_string(),
            },
            _ => Assessment::Decided(FreshnessState::StaleRebuild),
        }
    }

    /// Resolve a stale cache once the live head is known. A failed probe (`None`)
    /// counts as a moved head.
    pub fn resolve_probe(cached_head: &str, live_head: Option<&str>) -> FreshnessState {
        match live_head {
            Some(live) if live == cached_head => FreshnessState::StaleSameHead,
            _ => FreshnessState::StaleRebuild,
        }
    }
}

/// URLs still to be scraped after excluding everything already cached
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingUrls {
    pub urls: Vec<String>,
    /// More new URLs existed than the cap allowed
    pub truncated: bool,
}

/// Live catalog order is preserved; duplicates within `live` collapse to the first occurrence.
pub fn pending_urls(existing: &[CatalogEntry], live: &[String], cap: Option<usize>) -> PendingUrls {
    let mut seen: HashSet<&str> = existing.iter().map(|e| e.source_url.as_str()).collect();
    let mut urls = Vec::new();
    let mut truncated = false;

    for url in live {
        if !seen.insert(url.as_str()) {
            continue;
        }
        if cap.is_some_and(|cap| urls.len() >= cap) {
            truncated = true;
            break;
        }
        urls.push(url.clone());
    }

    PendingUrls { urls, truncated }
}

/// Append `scraped` after `existing`, dropping any entry whose `source_url` is already present.
pub fn merge_entries(existing: Vec<CatalogEntry>, scraped: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen: HashSet<String> = existing.iter().map(|e| e.source_url.clone()).collect();
    let mut merged = existing;
    merged.reserve(scraped.len());

    for entry in scraped {
        if seen.insert(entry.source_url.clone()) {
            merged.push(entry);
        }
    }
    merged
}
