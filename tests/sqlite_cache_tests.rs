//! Catalog cache persisted in a SQLite file survives a restart

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use catalog_refresh_lib::application::{CatalogRefreshService, CatalogRequest, ManualClock};
use catalog_refresh_lib::domain::CatalogCacheStore;
use catalog_refresh_lib::infrastructure::config::CatalogConfig;
use catalog_refresh_lib::infrastructure::fetch_error::{FetchError, FetchResult};
use catalog_refresh_lib::infrastructure::{DatabaseConnection, PageFetcher, SqliteCatalogCacheStore};

/// Two-film catalog on a single page
struct TinySite;

#[async_trait]
impl PageFetcher for TinySite {
    async fn fetch_page(&self, url: &str) -> FetchResult<String> {
        match url {
            "https://letterboxd.com/bob/films/by/date/" => Ok(r#"<ul class="poster-list">
                <li class="poster-container"><div data-target-link="/film/heat/"></div><span class="rating">★★★★★</span></li>
                <li class="poster-container"><div data-target-link="/film/ran/"></div></li>
            </ul>"#
                .to_string()),
            "https://letterboxd.com/film/heat/" => Ok(r#"<meta property="og:title" content="Heat">"#.to_string()),
            "https://letterboxd.com/film/ran/" => Ok(r#"<meta property="og:title" content="Ran">"#.to_string()),
            _ => Err(FetchError::from_status(404, url)),
        }
    }
}

async fn open_store(url: &str) -> Result<Arc<SqliteCatalogCacheStore>> {
    let db = DatabaseConnection::new(url).await?;
    db.migrate().await?;
    Ok(Arc::new(SqliteCatalogCacheStore::new(db.pool().clone())))
}

#[tokio::test]
async fn refreshed_catalog_is_readable_after_reopening() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite:{}", dir.path().join("catalog_cache.db").display());
    let config = CatalogConfig {
        batch_delay_ms: 0,
        fetch_reviews: false,
        ..CatalogConfig::default()
    };

    let service = CatalogRefreshService::new(
        Arc::new(TinySite),
        open_store(&url).await?,
        Arc::new(ManualClock::new(1_000)),
        config,
    )?;
    let entries = service.get_catalog(&CatalogRequest::new("bob")).await?;
    assert_eq!(entries.len(), 2);

    let reopened = open_store(&url).await?;
    let record = reopened.get("bob").await?.ok_or_else(|| anyhow::anyhow!("record missing"))?;
    assert_eq!(record.entries, entries);
    assert_eq!(record.entries[0].title, "Heat");
    assert_eq!(record.entries[0].rating.as_deref(), Some("★★★★★"));
    assert_eq!(record.entries[1].rating, None);
    assert_eq!(record.last_updated, 1_000);
    assert!(record.is_complete);
    Ok(())
}
