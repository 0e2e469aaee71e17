//! Request middleware and extractors

pub mod auth;
pub mod stack;

pub use auth::Caller;
pub use stack::{apply_middleware, MiddlewareConfig};
