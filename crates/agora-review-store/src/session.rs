//! In-process `ReviewApi` bound to one caller

use crate::review_store::ReviewStore;
use agora_core::{
    AgentId, CreateReviewInput, HelpfulVote, Identity, Result, ReviewApi, ReviewId, ReviewPage,
    ReviewQuery, ReviewStatus, ReviewView, UpdateReviewInput,
};
use async_trait::async_trait;
use std::sync::Arc;

/// A store session: every call is made as `identity` (anonymous when `None`)
pub struct SessionReviewApi<S: ReviewStore> {
    store: Arc<S>,
    identity: Option<Identity>,
}

impl<S: ReviewStore> SessionReviewApi<S> {
    pub fn new(store: Arc<S>, identity: Option<Identity>) -> Self {
        Self { store, identity }
    }

    pub fn anonymous(store: Arc<S>) -> Self {
        Self::new(store, None)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

impl<S: ReviewStore> Clone for SessionReviewApi<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity: self.identity.clone(),
        }
    }
}

#[async_trait]
impl<S: ReviewStore> ReviewApi for SessionReviewApi<S> {
    async fn get_reviews(&self, query: &ReviewQuery) -> Result<ReviewPage> {
        Ok(self.store.get_reviews(self.identity(), query).await?)
    }

    async fn get_user_review(&self, agent_id: &AgentId) -> Result<Option<ReviewView>> {
        Ok(self.store.get_user_review(self.identity(), agent_id).await?)
    }

    async fn create_review(&self, input: CreateReviewInput) -> Result<ReviewView> {
        Ok(self.store.create_review(self.identity(), input).await?)
    }

    async fn update_review(&self, id: ReviewId, input: UpdateReviewInput) -> Result<ReviewView> {
        Ok(self.store.update_review(self.identity(), id, input).await?)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        Ok(self.store.delete_review(self.identity(), id).await?)
    }

    async fn mark_helpful(&self, id: ReviewId, helpful: bool) -> Result<HelpfulVote> {
        Ok(self.store.mark_helpful(self.identity(), id, helpful).await?)
    }

    async fn update_review_status(&self, id: ReviewId, status: ReviewStatus) -> Result<ReviewView> {
        Ok(self
            .store
            .update_review_status(self.identity(), id, status)
            .await?)
    }
}
