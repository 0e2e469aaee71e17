//! Application State
//!
//! Shared by every handler: the review store and the session registry.

use agora_review_store::SqliteReviewStore;
use std::sync::Arc;
use tracing::info;

use crate::sessions::SessionRegistry;

pub struct AppState {
    pub store: Arc<SqliteReviewStore>,
    pub sessions: SessionRegistry,
    /// Server start time
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(store: SqliteReviewStore, sessions: SessionRegistry) -> Self {
        info!(
            "Application state ready ({} sessions, auto_publish={})",
            sessions.len(),
            store.policy().auto_publish
        );
        Self {
            store: Arc::new(store),
            sessions,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
