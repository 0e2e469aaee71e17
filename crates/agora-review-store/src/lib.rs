//! Agora Review Store - persistent reviews, helpfulness votes and ratings
//!
//! The store is the only authority on review state:
//! - at most one review per (agent, author), enforced by a unique key
//! - one helpfulness vote per (review, voter)
//! - aggregates recomputed from published reviews on every read
//!
//! Features:
//! - SQLite persistent storage
//! - Prometheus metrics
//! - `SessionReviewApi` for in-process clients

pub mod error;
pub mod metrics;
pub mod review_store;
pub mod session;
pub mod sqlite_store;

pub use error::StoreError;
pub use review_store::{ReviewStore, StorePolicy};
pub use session::SessionReviewApi;
pub use sqlite_store::SqliteReviewStore;
