//! Route table

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handlers::{health, reviews};
use crate::middleware::{apply_middleware, MiddlewareConfig};
use crate::state::AppState;

/// Create the complete router with all routes
pub fn create_router(state: Arc<AppState>, config: MiddlewareConfig) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health_handler))
        // Reads
        .route("/agents/:agent_id/reviews", get(reviews::list_reviews))
        .route("/agents/:agent_id/reviews/mine", get(reviews::user_review))
        .route("/agents/:agent_id/rating", get(reviews::rating_stats))
        // Writes
        .route("/reviews", post(reviews::create_review))
        .route(
            "/reviews/:id",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/reviews/:id/helpful", post(reviews::mark_helpful))
        .route("/reviews/:id/status", put(reviews::update_status))
        .with_state(state);

    let router = Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(health::metrics_handler));

    apply_middleware(router, config)
}
