//! Infrastructure layer: configuration, logging, HTTP, parsing and storage
//!
//! Everything that touches the network, the filesystem or the database lives
//! here behind the traits the application layer consumes.

pub mod catalog_cache_repository;
pub mod config;
pub mod database_connection;
pub mod fetch_error;
pub mod http_client;
pub mod logging;
pub mod pagination_walker;
pub mod parsing;
pub mod retry_policy;

// Re-export commonly used items
pub use catalog_cache_repository::{InMemoryCatalogCacheStore, SqliteCatalogCacheStore};
pub use config::{AppConfig, CatalogConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use fetch_error::{FetchError, FetchResult};
pub use http_client::{HttpTransport, PageFetcher, RateLimitedFetcher, RawResponse, ReqwestTransport};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use pagination_walker::{CatalogWalk, CatalogWalker, WalkStop};
pub use parsing::{CatalogPageParser, FilmPageParser, ParsingConfig, ParsingError, ReviewPageParser};
pub use retry_policy::RetryPolicy;
