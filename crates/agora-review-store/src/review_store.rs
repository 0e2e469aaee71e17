use crate::error::Result;
use agora_core::{
    AgentId, AggregateRatingStats, CreateReviewInput, HelpfulVote, Identity, ReviewId, ReviewPage,
    ReviewQuery, ReviewStatus, ReviewView, UpdateReviewInput,
};
use async_trait::async_trait;

/// The authoritative review store. Every operation names its caller
/// explicitly; `None` is an anonymous reader.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn get_reviews(
        &self,
        caller: Option<&Identity>,
        query: &ReviewQuery,
    ) -> Result<ReviewPage>;

    async fn rating_stats(&self, agent_id: &AgentId) -> Result<AggregateRatingStats>;

    async fn get_user_review(
        &self,
        caller: Option<&Identity>,
        agent_id: &AgentId,
    ) -> Result<Option<ReviewView>>;

    async fn create_review(
        &self,
        caller: Option<&Identity>,
        input: CreateReviewInput,
    ) -> Result<ReviewView>;

    async fn update_review(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        input: UpdateReviewInput,
    ) -> Result<ReviewView>;

    async fn delete_review(&self, caller: Option<&Identity>, id: ReviewId) -> Result<bool>;

    async fn mark_helpful(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        helpful: bool,
    ) -> Result<HelpfulVote>;

    async fn update_review_status(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        status: ReviewStatus,
    ) -> Result<ReviewView>;
}

/// Moderation policy applied on writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePolicy {
    /// New reviews go live immediately. When off they start PENDING and an
    /// author's edit sends the review back to PENDING.
    pub auto_publish: bool,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self { auto_publish: true }
    }
}
