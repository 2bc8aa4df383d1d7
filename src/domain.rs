//! Domain module - catalog model, freshness policy and store interface
//!
//! Nothing in here performs I/O; the infrastructure layer implements the
//! store trait and the application layer drives the policy.

pub mod backfill;
pub mod catalog;
pub mod freshness;
pub mod repositories;

pub use backfill::BackfillStatus;
pub use catalog::{CatalogEntry, RatingIndex, UNKNOWN_DIRECTOR, UNKNOWN_TITLE, UserCacheRecord};
pub use freshness::{Assessment, FreshnessPolicy, FreshnessState, PendingUrls, merge_entries, pending_urls};
pub use repositories::{CacheFieldUpdate, CatalogCacheStore, StoreError, StoreResult};
