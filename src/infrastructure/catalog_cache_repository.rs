//! Cache store adapters
//!
//! `SqliteCatalogCacheStore` keeps one row per username with the entry list
//! as a JSON array. `InMemoryCatalogCacheStore` offers the same semantics over
//! a map for tests and embedding.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::catalog::{CatalogEntry, UserCacheRecord};
use crate::domain::repositories::{CacheFieldUpdate, CatalogCacheStore, StoreError, StoreResult};

/// SQLite implementation of CatalogCacheStore
pub struct SqliteCatalogCacheStore {
    pool: SqlitePool,
}

impl SqliteCatalogCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> StoreResult<UserCacheRecord> {
        let entries_json: String = row.try_get("entries")?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&entries_json)?;

        Ok(UserCacheRecord {
            username: row.try_get("username")?,
            entries,
            last_updated: row.try_get("last_updated")?,
            is_complete: row.try_get::<i64, _>("is_complete")? != 0,
        })
    }
}

#[async_trait]
impl CatalogCacheStore for SqliteCatalogCacheStore {
    async fn get(&self, username: &str) -> StoreResult<Option<UserCacheRecord>> {
        let row = sqlx::query(
            r"
            SELECT username, entries, last_updated, is_complete
            FROM catalog_cache
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn put(&self, record: &UserCacheRecord) -> StoreResult<()> {
        let entries_json = serde_json::to_string(&record.entries)?;

        sqlx::query(
            r"
            INSERT INTO catalog_cache (username, entries, last_updated, is_complete)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                entries = excluded.entries,
                last_updated = excluded.last_updated,
                is_complete = excluded.is_complete
            ",
        )
        .bind(&record.username)
        .bind(entries_json)
        .bind(record.last_updated)
        .bind(i64::from(record.is_complete))
        .execute(&self.pool)
        .await?;

        debug!("Stored {} entries for {}", record.entries.len(), record.username);
        Ok(())
    }

    async fn update(&self, username: &str, update: CacheFieldUpdate) -> StoreResult<()> {
        let query = match update {
            CacheFieldUpdate::LastUpdated(timestamp) => {
                sqlx::query("UPDATE catalog_cache SET last_updated = ? WHERE username = ?").bind(timestamp)
            }
            CacheFieldUpdate::IsComplete(complete) => {
                sqlx::query("UPDATE catalog_cache SET is_complete = ? WHERE username = ?").bind(i64::from(complete))
            }
        };

        let result = query.bind(username).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                username: username.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, username: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM catalog_cache WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Map-backed store
#[derive(Default)]
pub struct InMemoryCatalogCacheStore {
    records: RwLock<HashMap<String, UserCacheRecord>>,
}

impl InMemoryCatalogCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = UserCacheRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.username.clone(), r)).collect()),
        }
    }
}

#[async_trait]
impl CatalogCacheStore for InMemoryCatalogCacheStore {
    async fn get(&self, username: &str) -> StoreResult<Option<UserCacheRecord>> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn put(&self, record: &UserCacheRecord) -> StoreResult<()> {
        self.records
            .write()
            .await
            .insert(record.username.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, username: &str, update: CacheFieldUpdate) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(username).ok_or_else(|| StoreError::NotFound {
            username: username.to_string(),
        })?;

        match update {
            CacheFieldUpdate::LastUpdated(timestamp) => record.last_updated = timestamp,
            CacheFieldUpdate::IsComplete(complete) => record.is_complete = complete,
        }
        Ok(())
    }

    async fn delete(&self, username: &str) -> StoreResult<bool> {
        Ok(self.records.write().await.remove(username).is_some())
    }
}
