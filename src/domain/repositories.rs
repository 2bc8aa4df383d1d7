//! Cache store interface for per-user catalog records
//!
//! The store is a key-value table keyed by username with single-row atomicity.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::UserCacheRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to (de)serialize cached entries: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no cache record for user '{username}'")]
    NotFound { username: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Single-field mutation applied without rewriting the entry list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFieldUpdate {
    LastUpdated(i64),
    IsComplete(bool),
}

#[async_trait]
pub trait CatalogCacheStore: Send + Sync {
    async fn get(&self, username: &str) -> StoreResult<Option<UserCacheRecord>>;

    /// Insert or fully replace the record
    async fn put(&self, record: &UserCacheRecord) -> StoreResult<()>;

    /// Fails with `StoreError::NotFound` when no row exists
    async fn update(&self, username: &str, update: CacheFieldUpdate) -> StoreResult<()>;

    /// Returns whether a row was removed
    async fn delete(&self, username: &str) -> StoreResult<bool>;
}
