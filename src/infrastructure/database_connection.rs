// SQLite pool for the catalog cache
// Creates the database file on first use and the catalog_cache table on migrate.

use anyhow::{Context, Result};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = is_in_memory(database_url);

        if !in_memory {
            let db_path = database_path(database_url);

            if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
            }

            if !Path::new(db_path).exists() {
                std::fs::File::create(db_path).with_context(|| format!("Failed to create database file {db_path}"))?;
            }
        }

        // Every connection to :memory: opens its own empty database
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_catalog_cache_sql = r#"
            CREATE TABLE IF NOT EXISTS catalog_cache (
                username TEXT PRIMARY KEY,
                entries TEXT NOT NULL,
                last_updated INTEGER NOT NULL,
                is_complete INTEGER NOT NULL DEFAULT 0
            )
        "#;

        sqlx::query(create_catalog_cache_sql)
            .execute(&self.pool)
            .await
            .context("Failed to create catalog_cache table")?;

        info!("Database schema ready");
        Ok(())
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Filesystem path of a `sqlite:` URL, without query parameters
fn database_path(database_url: &str) -> &str {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    path.split('?').next().unwrap_or(path)
}
