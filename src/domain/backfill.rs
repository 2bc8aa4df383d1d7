//! Backfill outcome reported to callers and background task queues

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillStatus {
    pub success: bool,
    pub message: String,
    /// Entries in the cache after the call (existing count when refused, 0 on failure)
    pub count: usize,
}

impl BackfillStatus {
    pub fn completed(username: &str, count: usize, is_complete: bool) -> Self {
        let message = if is_complete {
            format!("Backfilled {count} films for {username}")
        } else {
            format!("Backfilled {count} films for {username} (cache incomplete, a later refresh will fill the gaps)")
        };
        Self {
            success: true,
            message,
            count,
        }
    }

    pub fn already_cached(username: &str, count: usize) -> Self {
        Self {
            success: false,
            message: format!(
                "Cache already exists for {username} with {count} films; pass force=true to discard it and rebuild"
            ),
            count,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("Backfill failed: {error}"),
            count: 0,
        }
    }
}
