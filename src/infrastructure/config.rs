//! Configuration infrastructure
//!
//! Settings are grouped by concern:
//! 1. Scraper / HTTP settings (headers, timeout, request quota)
//! 2. Retry policy for page fetches
//! 3. Catalog refresh policy (TTL, page cap, incremental cap, batching)
//! 4. Database and logging
//!
//! The JSON file under the user config directory is the base layer and
//! `CATALOG_REFRESH__<SECTION>__<KEY>` environment variables override it.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub retry: RetryConfig,
    pub catalog: CatalogConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Site root used for catalog, film and review URLs
    pub base_url: String,

    pub user_agent: String,

    pub referer: String,

    pub accept_language: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Global request quota; 0 disables the limiter
    pub max_requests_per_second: u32,
}

/// Retry behaviour for failed page fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    pub max_retries: u32,

    /// Lower bound of the randomized pre-retry delay
    pub min_delay_ms: u64,

    /// Upper bound of the randomized pre-retry delay
    pub max_delay_ms: u64,

    /// Fixed wait after an HTTP 429
    pub throttle_delay_ms: u64,
}

/// Freshness and rebuild policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub ttl_seconds: i64,

    /// Hard cap on catalog pages walked per pass
    pub max_pages: u32,

    /// New films scraped per catalog request; backfills ignore it
    pub incremental_cap: usize,

    /// Films processed between pauses
    pub batch_size: usize,

    /// Pause between batches in milliseconds
    pub batch_delay_ms: u64,

    /// Compare the live head with the cached head before rebuilding
    pub head_probe_enabled: bool,

    /// Fetch the user's review page for every new film
    pub fetch_reviews: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite:/path/to/catalog.db` or `sqlite::memory:`
    pub url: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; defaults to `<data dir>/logs`
    pub directory: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: letterboxd::BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            referer: letterboxd::BASE_URL.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            min_delay_ms: defaults::MIN_RETRY_DELAY_MS,
            max_delay_ms: defaults::MAX_RETRY_DELAY_MS,
            throttle_delay_ms: defaults::THROTTLE_DELAY_MS,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: defaults::TTL_SECONDS,
            max_pages: defaults::MAX_PAGES,
            incremental_cap: defaults::INCREMENTAL_CAP,
            batch_size: defaults::BATCH_SIZE,
            batch_delay_ms: defaults::BATCH_DELAY_MS,
            head_probe_enabled: true,
            fetch_reviews: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let url = ConfigManager::get_app_data_dir()
            .map(|dir| format!("sqlite:{}", dir.join("catalog_cache.db").display()))
            .unwrap_or_else(|_| "sqlite:catalog_cache.db".to_string());
        Self { url }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            directory: None,
            module_filters: HashMap::from([
                ("sqlx".to_string(), "warn".to_string()),
                ("reqwest".to_string(), "info".to_string()),
                ("hyper".to_string(), "warn".to_string()),
                ("html5ever".to_string(), "warn".to_string()),
            ]),
        }
    }
}

impl AppConfig {
    /// Reject settings the refresh engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.catalog.max_pages == 0 {
            bail!("catalog.max_pages must be greater than 0");
        }
        if self.catalog.batch_size == 0 {
            bail!("catalog.batch_size must be greater than 0");
        }
        if self.catalog.ttl_seconds <= 0 {
            bail!("catalog.ttl_seconds must be positive");
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            bail!(
                "retry.min_delay_ms ({}) cannot exceed retry.max_delay_ms ({})",
                self.retry.min_delay_ms,
                self.retry.max_delay_ms
            );
        }
        url::Url::parse(&self.scraper.base_url)
            .with_context(|| format!("scraper.base_url is not a valid URL: {}", self.scraper.base_url))?;
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Manager for the default config location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration, writing the defaults first if no file exists
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            self.save_config(&AppConfig::default()).await?;
        }

        let config = Self::load_layered(&self.config_path)?;
        config.validate()?;
        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// JSON file first, then `CATALOG_REFRESH__SECTION__KEY` environment overrides
    fn load_layered(path: &Path) -> Result<AppConfig> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;

        settings
            .try_deserialize::<AppConfig>()
            .context("Configuration file contains invalid settings")
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

const APP_DIR_NAME: &str = "catalog-refresh";
const CONFIG_FILE_NAME: &str = "catalog_refresh_config.json";
const ENV_PREFIX: &str = "CATALOG_REFRESH";

/// Letterboxd site constants
pub mod letterboxd {
    pub const BASE_URL: &str = "https://letterboxd.com";

    /// Catalog path relative to the user's profile, newest watch first
    pub const CATALOG_PATH: &str = "films/by/date/";
}

/// Default configuration values
pub mod defaults {
    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;

    /// Additional attempts after the first
    pub const MAX_RETRIES: u32 = 3;

    pub const MIN_RETRY_DELAY_MS: u64 = 1000;

    pub const MAX_RETRY_DELAY_MS: u64 = 3000;

    /// Wait after HTTP 429
    pub const THROTTLE_DELAY_MS: u64 = 10_000;

    pub const TTL_SECONDS: i64 = crate::domain::freshness::DEFAULT_TTL_SECONDS;

    pub const MAX_PAGES: u32 = 100;

    pub const INCREMENTAL_CAP: usize = 50;

    pub const BATCH_SIZE: usize = 5;

    pub const BATCH_DELAY_MS: u64 = 1000;

    pub const LOG_LEVEL: &str = "info";
}

/// URL building helpers
pub mod utils {
    use super::letterboxd::CATALOG_PATH;

    /// First catalog page for a user
    pub fn catalog_url(base_url: &str, username: &str) -> String {
        format!("{}/{}/{}", base_url.trim_end_matches('/'), username, CATALOG_PATH)
    }

    /// `<base>/<username>/film/<slug>/`
    pub fn review_url(base_url: &str, username: &str, film_slug: &str) -> String {
        format!("{}/{}/film/{}/", base_url.trim_end_matches('/'), username, film_slug)
    }

    /// Slug of a film page URL (`.../film/<slug>/`)
    pub fn film_slug(source_url: &str) -> Option<&str> {
        let (_, rest) = source_url.split_once("/film/")?;
        let slug = rest.split('/').next()?;
        (!slug.is_empty()).then_some(slug)
    }
}
