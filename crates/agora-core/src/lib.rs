//! Core types and utilities for agora reviews
//!
//! # Modules
//!
//! - `api`: `ReviewApi`, the client contract of the review store
//! - `config`: Environment configuration loading
//! - `error`: Error taxonomy and Result alias
//! - `identity`: Authenticated caller identity and roles
//! - `text`: Pros/cons line transforms
//! - `types`: Review, aggregate and query types
//! - `validation`: Review field rules

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod text;
pub mod types;
pub mod validation;

// Re-exports
pub use api::ReviewApi;
pub use error::{ErrorCode, ErrorEnvelope, Result, ReviewError};
pub use identity::{require_identity, Identity, Role};
pub use text::{lines_to_list, list_to_lines, normalize_entries};
pub use types::*;
pub use validation::ValidatedReview;
