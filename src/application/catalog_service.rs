//! Catalog refresh service
//!
//! Serves a user's watched-film catalog from the cache and decides, per
//! request, whether the cache is still good:
//!
//! 1. fast mode returns whatever is cached without any network traffic
//! 2. a cache younger than the TTL is served verbatim
//! 3. a stale cache whose head matches the live head only gets a new timestamp
//! 4. anything else triggers an incremental rebuild that scrapes new films only
//!
//! Rebuilds for one username are serialized through `UserLocks`; the verdict
//! is re-evaluated once the lock is held.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::clock::Clock;
use super::entry_builder::{BatchPlan, EntryBuilder};
use super::error::{CatalogResult, validate_username};
use super::user_locks::UserLocks;
use crate::domain::catalog::{CatalogEntry, UserCacheRecord};
use crate::domain::freshness::{Assessment, FreshnessPolicy, FreshnessState, merge_entries, pending_urls};
use crate::domain::repositories::{CacheFieldUpdate, CatalogCacheStore, StoreResult};
use crate::infrastructure::config::CatalogConfig;
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::pagination_walker::CatalogWalker;
use crate::infrastructure::parsing::{CatalogPageParser, FilmPageParser, ParsingConfig, ReviewPageParser};

/// One catalog read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRequest {
    pub username: String,
    /// Serve the cache as-is, never scrape
    pub fast_mode: bool,
    /// Truncate the returned list; the cache always keeps everything
    pub limit: Option<usize>,
}

impl CatalogRequest {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn fast(mut self) -> Self {
        self.fast_mode = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Result of a rebuild pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub entries: Vec<CatalogEntry>,
    /// Films scraped during this pass
    pub scraped: usize,
    pub is_complete: bool,
    /// False when the catalog could not be reached and the store was left alone
    pub persisted: bool,
}

pub struct CatalogRefreshService {
    store: Arc<dyn CatalogCacheStore>,
    clock: Arc<dyn Clock>,
    walker: CatalogWalker,
    builder: EntryBuilder,
    policy: FreshnessPolicy,
    config: CatalogConfig,
    locks: UserLocks,
}

impl CatalogRefreshService {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn CatalogCacheStore>,
        clock: Arc<dyn Clock>,
        config: CatalogConfig,
    ) -> CatalogResult<Self> {
        Self::with_parsing_config(fetcher, store, clock, config, &ParsingConfig::default())
    }

    /// Service against a different site root or selector set
    pub fn with_parsing_config(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn CatalogCacheStore>,
        clock: Arc<dyn Clock>,
        config: CatalogConfig,
        parsing: &ParsingConfig,
    ) -> CatalogResult<Self> {
        let walker = CatalogWalker::new(
            Arc::clone(&fetcher),
            CatalogPageParser::with_config(parsing)?,
            parsing.base_url.clone(),
        );
        let builder = EntryBuilder::new(
            fetcher,
            FilmPageParser::with_config(parsing)?,
            ReviewPageParser::with_config(parsing)?,
            parsing.base_url.clone(),
            config.fetch_reviews,
        );

        Ok(Self {
            store,
            clock,
            walker,
            builder,
            policy: FreshnessPolicy::new(config.ttl_seconds, config.head_probe_enabled),
            config,
            locks: UserLocks::new(),
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn walker(&self) -> &CatalogWalker {
        &self.walker
    }

    /// The user's catalog, newest watch first for a freshly built cache
    pub async fn get_catalog(&self, request: &CatalogRequest) -> CatalogResult<Vec<CatalogEntry>> {
        let username = validate_username(&request.username)?;
        let username = username.as_str();

        if request.fast_mode {
            let cached = self.store.get(username).await?;
            info!(
                "Fast request for {}: serving {} cached entries",
                username,
                cached.as_ref().map_or(0, UserCacheRecord::len)
            );
            return Ok(apply_limit(cached.map(|r| r.entries).unwrap_or_default(), request.limit));
        }

        if let Some(record) = self.store.get(username).await? {
            if self.policy.is_fresh(record.last_updated, self.clock.now()) {
                info!("Cache for {} is fresh ({} entries)", username, record.len());
                return Ok(apply_limit(record.entries, request.limit));
            }
        }

        let _guard = self.locks.acquire(username).await;

        // Another request may have refreshed the cache while we waited
        let record = self.store.get(username).await?;
        let state = self.decide(username, record.as_ref()).await;
        info!("Freshness verdict for {}: {:?}", username, state);

        let entries = match (state, record) {
            (FreshnessState::Fresh, Some(record)) => record.entries,
            (FreshnessState::StaleSameHead, Some(record)) => {
                self.store
                    .update(username, CacheFieldUpdate::LastUpdated(self.clock.now()))
                    .await?;
                record.entries
            }
            (_, record) => {
                self.rebuild(username, record, Some(self.config.incremental_cap))
                    .await?
                    .entries
            }
        };

        Ok(apply_limit(entries, request.limit))
    }

    /// Cached record without any freshness check
    pub async fn cached_record(&self, username: &str) -> CatalogResult<Option<UserCacheRecord>> {
        let username = validate_username(username)?;
        Ok(self.store.get(&username).await?)
    }

    /// Freshness state, probing the live head when the clock alone cannot decide
    pub async fn decide(&self, username: &str, record: Option<&UserCacheRecord>) -> FreshnessState {
        match self.policy.assess(record, self.clock.now()) {
            Assessment::Decided(state) => state,
            Assessment::ProbeHead { cached_head } => {
                let probe = self.walker.walk(username, 1, Some(1)).await;
                if probe.head().is_none() {
                    warn!("Head probe for {} returned nothing, rebuilding", username);
                }
                FreshnessPolicy::resolve_probe(&cached_head, probe.head())
            }
        }
    }

    /// Walk the catalog, scrape films missing from `existing` (at most `cap`),
    /// append them and persist the full record.
    pub(crate) async fn rebuild(
        &self,
        username: &str,
        existing: Option<UserCacheRecord>,
        cap: Option<usize>,
    ) -> StoreResult<RebuildOutcome> {
        let walk = self.walker.walk(username, self.config.max_pages, None).await;

        if walk.is_unavailable() {
            warn!("Catalog of {} is unreachable, keeping the cached record", username);
            let is_complete = existing.as_ref().is_some_and(|r| r.is_complete);
            return Ok(RebuildOutcome {
                entries: existing.map(|r| r.entries).unwrap_or_default(),
                scraped: 0,
                is_complete,
                persisted: false,
            });
        }

        let existing_entries = existing.map(|r| r.entries).unwrap_or_default();
        let pending = pending_urls(&existing_entries, &walk.urls, cap);
        if pending.truncated {
            info!(
                "Scraping the first {} new films of {}; the rest wait for a later pass",
                pending.urls.len(),
                username
            );
        }

        let plan = BatchPlan {
            batch_size: self.config.batch_size,
            batch_delay: Duration::from_millis(self.config.batch_delay_ms),
        };
        let scraped = self.builder.build_all(username, &pending.urls, &walk.ratings, plan).await;
        let scraped_count = scraped.len();

        // A skipped film keeps the record incomplete so the next stale
        // request rebuilds instead of trusting an unchanged head.
        let is_complete = walk.reached_end() && !pending.truncated && scraped_count == pending.urls.len();
        let record = UserCacheRecord::new(
            username,
            merge_entries(existing_entries, scraped),
            self.clock.now(),
            is_complete,
        );
        self.store.put(&record).await?;

        info!(
            "Rebuilt catalog for {}: {} new, {} total, complete={}",
            username,
            scraped_count,
            record.len(),
            is_complete
        );

        Ok(RebuildOutcome {
            entries: record.entries,
            scraped: scraped_count,
            is_complete,
            persisted: true,
        })
    }

    pub(crate) fn locks(&self) -> &UserLocks {
        &self.locks
    }

    pub(crate) fn store(&self) -> &Arc<dyn CatalogCacheStore> {
        &self.store
    }
}

fn apply_limit(mut entries: Vec<CatalogEntry>, limit: Option<usize>) -> Vec<CatalogEntry> {
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}
