//! Client-side view of the review store
//!
//! One `ReviewApi` value speaks for one session: the caller identity is bound
//! when the value is built (a bearer token for the HTTP client, an
//! `Identity` for the in-process adapter), so operations take no caller.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AgentId, CreateReviewInput, HelpfulVote, ReviewId, ReviewPage, ReviewQuery, ReviewStatus,
    ReviewView, UpdateReviewInput,
};

#[async_trait]
pub trait ReviewApi: Send + Sync {
    /// `agentReviews(agentId, sortBy)`
    async fn get_reviews(&self, query: &ReviewQuery) -> Result<ReviewPage>;

    /// `userReviewForAgent(agentId)`
    async fn get_user_review(&self, agent_id: &AgentId) -> Result<Option<ReviewView>>;

    /// `createReview(input)`
    async fn create_review(&self, input: CreateReviewInput) -> Result<ReviewView>;

    /// `updateReview(id, input)`
    async fn update_review(&self, id: ReviewId, input: UpdateReviewInput) -> Result<ReviewView>;

    /// `deleteReview(id)`
    async fn delete_review(&self, id: ReviewId) -> Result<bool>;

    /// `markReviewHelpful(id, helpful)`
    async fn mark_helpful(&self, id: ReviewId, helpful: bool) -> Result<HelpfulVote>;

    /// `updateReviewStatus(id, status)`, moderators only
    async fn update_review_status(&self, id: ReviewId, status: ReviewStatus) -> Result<ReviewView>;
}
