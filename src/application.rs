//! Application layer - catalog requests and backfills
//!
//! Wires the domain policy to the fetcher, the parsers and the cache store.

pub mod backfill_orchestrator;
pub mod catalog_service;
pub mod clock;
pub mod entry_builder;
pub mod error;
pub mod user_locks;

// Re-export commonly used items
pub use backfill_orchestrator::BackfillOrchestrator;
pub use catalog_service::{CatalogRefreshService, CatalogRequest, RebuildOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry_builder::{BatchPlan, EntryBuilder};
pub use error::{CatalogError, CatalogResult};
pub use user_locks::UserLocks;
