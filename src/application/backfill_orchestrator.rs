//! Full catalog backfill
//!
//! Rebuilds a user's cache from scratch with no incremental cap. Every
//! outcome, including failures, is reported through `BackfillStatus`, so the
//! call is safe to run as a detached background task.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use tracing::{error, info, warn};

use super::catalog_service::CatalogRefreshService;
use super::error::validate_username;
use crate::domain::backfill::BackfillStatus;

pub struct BackfillOrchestrator {
    service: Arc<CatalogRefreshService>,
}

impl BackfillOrchestrator {
    pub fn new(service: Arc<CatalogRefreshService>) -> Self {
        Self { service }
    }

    /// Refuses to touch an existing cache unless `force` is set
    pub async fn backfill(&self, username: &str, force: bool) -> BackfillStatus {
        let username = match validate_username(username) {
            Ok(username) => username,
            Err(e) => return BackfillStatus::failed(e),
        };
        let username = username.as_str();

        let _guard = self.service.locks().acquire(username).await;
        let store = self.service.store();

        let existing = match store.get(username).await {
            Ok(existing) => existing,
            Err(e) => {
                error!("Backfill for {} could not read the cache: {}", username, e);
                return BackfillStatus::failed(e);
            }
        };

        if let Some(record) = existing {
            if !force {
                info!("Backfill for {} refused: {} films already cached", username, record.len());
                return BackfillStatus::already_cached(username, record.len());
            }
            info!("Discarding {} cached films of {} before backfill", record.len(), username);
            if let Err(e) = store.delete(username).await {
                error!("Backfill for {} could not clear the cache: {}", username, e);
                return BackfillStatus::failed(e);
            }
        }

        match self.service.rebuild(username, None, None).await {
            Ok(outcome) if outcome.persisted => {
                info!("Backfill for {} stored {} films", username, outcome.entries.len());
                BackfillStatus::completed(username, outcome.entries.len(), outcome.is_complete)
            }
            Ok(_) => {
                warn!("Backfill for {} could not reach the catalog", username);
                BackfillStatus::failed(format!("could not fetch the catalog of {username}"))
            }
            Err(e) => {
                error!("Backfill for {} could not store the catalog: {}", username, e);
                BackfillStatus::failed(e)
            }
        }
    }
}
