//! Catalog Refresh - per-user watched-film catalog cache
//!
//! Scrapes a Letterboxd user's film diary into a cached catalog, keeps it
//! fresh with a TTL plus a cheap head-of-catalog probe, scrapes only newly
//! watched films on refresh, and offers a full backfill for first loads.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the request-level API
pub use application::{
    BackfillOrchestrator, CatalogError, CatalogRefreshService, CatalogRequest, Clock, SystemClock,
};
pub use domain::{BackfillStatus, CatalogEntry, UserCacheRecord};
