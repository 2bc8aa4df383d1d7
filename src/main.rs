mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use catalog_refresh_lib::application::{
    BackfillOrchestrator, CatalogRefreshService, CatalogRequest, SystemClock,
};
use catalog_refresh_lib::infrastructure::config::AppConfig;
use catalog_refresh_lib::infrastructure::{
    ConfigManager, DatabaseConnection, ParsingConfig, RateLimitedFetcher, RetryPolicy, SqliteCatalogCacheStore,
    init_logging_with_config,
};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = manager.load_config().await?;
    let _log_guard = init_logging_with_config(&config.logging)?;

    let service = Arc::new(build_service(&config).await?);

    match cli.command {
        Commands::Refresh { username, fast, limit } => {
            let request = CatalogRequest {
                username,
                fast_mode: fast,
                limit,
            };
            let entries = service.get_catalog(&request).await?;
            info!("Returning {} entries for {}", entries.len(), request.username);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Backfill { username, force } => {
            let status = BackfillOrchestrator::new(service).backfill(&username, force).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Show { username } => {
            let record = service.cached_record(&username).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

async fn build_service(config: &AppConfig) -> Result<CatalogRefreshService> {
    let db = DatabaseConnection::new(&config.database.url).await?;
    db.migrate().await?;
    let store = Arc::new(SqliteCatalogCacheStore::new(db.pool().clone()));

    let fetcher = RateLimitedFetcher::from_config(&config.scraper, RetryPolicy::from_config(&config.retry))
        .context("Failed to build HTTP client")?;

    CatalogRefreshService::with_parsing_config(
        Arc::new(fetcher),
        store,
        Arc::new(SystemClock),
        config.catalog.clone(),
        &ParsingConfig::with_base_url(&config.scraper.base_url),
    )
    .context("Failed to build catalog service")
}
