//! Review API handlers
//!
//! Thin adapters: resolve the caller, parse the request, call the store.

use agora_core::{
    AgentId, AggregateRatingStats, CreateReviewInput, DeleteResult, HelpfulRequest, HelpfulVote,
    PageRequest, ReviewId, ReviewPage, ReviewQuery, ReviewView, SortBy, StatusRequest,
    UpdateReviewInput,
};
use agora_review_store::ReviewStore;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::middleware::Caller;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub sort_by: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListParams {
    fn into_query(self, agent_id: AgentId) -> ApiResult<ReviewQuery> {
        let sort_by = match self.sort_by.as_deref() {
            Some(raw) => raw.parse::<SortBy>()?,
            None => SortBy::default(),
        };
        let page = PageRequest::new(
            self.limit.unwrap_or(PageRequest::DEFAULT_LIMIT),
            self.offset.unwrap_or(0),
        );
        Ok(ReviewQuery::new(agent_id, sort_by).with_page(page))
    }
}

/// GET /api/agents/:agent_id/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(agent_id): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<ReviewPage>> {
    let Query(params) = params?;
    let query = params.into_query(AgentId::new(agent_id))?;
    let page = state.store.get_reviews(caller.identity(), &query).await?;
    Ok(Json(page))
}

/// GET /api/agents/:agent_id/reviews/mine
pub async fn user_review(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(agent_id): Path<String>,
) -> ApiResult<Json<Option<ReviewView>>> {
    let review = state
        .store
        .get_user_review(caller.identity(), &AgentId::new(agent_id))
        .await?;
    Ok(Json(review))
}

/// GET /api/agents/:agent_id/rating
pub async fn rating_stats(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> ApiResult<Json<AggregateRatingStats>> {
    let stats = state.store.rating_stats(&AgentId::new(agent_id)).await?;
    Ok(Json(stats))
}

/// POST /api/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    payload: Result<Json<CreateReviewInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReviewView>)> {
    // An anonymous caller is told to log in before being told the body is wrong.
    agora_core::require_identity(caller.identity())?;
    let Json(input) = payload?;
    let review = state.store.create_review(caller.identity(), input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// PUT /api/reviews/:id
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<UpdateReviewInput>, JsonRejection>,
) -> ApiResult<Json<ReviewView>> {
    agora_core::require_identity(caller.identity())?;
    let id: ReviewId = id.parse()?;
    let Json(input) = payload?;
    let review = state.store.update_review(caller.identity(), id, input).await?;
    Ok(Json(review))
}

/// DELETE /api/reviews/:id
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResult>> {
    agora_core::require_identity(caller.identity())?;
    let id: ReviewId = id.parse()?;
    let success = state.store.delete_review(caller.identity(), id).await?;
    Ok(Json(DeleteResult { success }))
}

/// POST /api/reviews/:id/helpful
pub async fn mark_helpful(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<HelpfulRequest>, JsonRejection>,
) -> ApiResult<Json<HelpfulVote>> {
    agora_core::require_identity(caller.identity())?;
    let id: ReviewId = id.parse()?;
    let Json(HelpfulRequest { helpful }) = payload?;
    let vote = state.store.mark_helpful(caller.identity(), id, helpful).await?;
    Ok(Json(vote))
}

/// PUT /api/reviews/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewView>> {
    agora_core::require_identity(caller.identity())?;
    let id: ReviewId = id.parse()?;
    let Json(StatusRequest { status }) = payload?;
    let review = state
        .store
        .update_review_status(caller.identity(), id, status)
        .await?;
    Ok(Json(review))
}
