//! Scripted `ReviewApi` double for controller tests

use agora_core::{
    AgentId, AuthorView, CreateReviewInput, HelpfulVote, Rating, Result, ReviewApi, ReviewError,
    ReviewId, ReviewPage, ReviewQuery, ReviewStatus, ReviewView, UpdateReviewInput, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn review(author: &str, rating: u8, title: &str) -> ReviewView {
    let now = Utc::now();
    ReviewView {
        id: ReviewId::new(),
        agent_id: AgentId::new("agent-x"),
        rating: Rating::new(rating).unwrap(),
        title: title.to_string(),
        content: format!("{} content", title),
        pros: vec![],
        cons: vec![],
        verified_purchase: false,
        helpful_votes: 0,
        status: ReviewStatus::Published,
        created_at: now,
        updated_at: now,
        formatted_date: agora_core::types::format_review_date(&now),
        is_helpful: false,
        author: AuthorView {
            id: UserId::new(author),
            username: author.to_string(),
            avatar: None,
        },
    }
}

/// Records every call and answers from queued responses
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<&'static str>>,
    pub queries: Mutex<Vec<ReviewQuery>>,
    pub created: Mutex<Vec<CreateReviewInput>>,
    pub updated: Mutex<Vec<(ReviewId, UpdateReviewInput)>>,
    pages: Mutex<VecDeque<Result<ReviewPage>>>,
    user_review: Mutex<Option<Result<Option<ReviewView>>>>,
    writes: Mutex<VecDeque<Result<ReviewView>>>,
    /// When set, create/update wait for a notification before answering
    gate: Option<Arc<Notify>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_page(&self, page: Result<ReviewPage>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn set_user_review(&self, review: Result<Option<ReviewView>>) {
        *self.user_review.lock().unwrap() = Some(review);
    }

    pub fn push_write(&self, result: Result<ReviewView>) {
        self.writes.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }

    fn next_write(&self) -> Result<ReviewView> {
        self.writes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReviewError::unknown("no scripted write")))
    }
}

#[async_trait]
impl ReviewApi for ScriptedApi {
    async fn get_reviews(&self, query: &ReviewQuery) -> Result<ReviewPage> {
        self.record("get_reviews");
        self.queries.lock().unwrap().push(query.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReviewError::unknown("no scripted page")))
    }

    async fn get_user_review(&self, _agent_id: &AgentId) -> Result<Option<ReviewView>> {
        self.record("get_user_review");
        self.user_review.lock().unwrap().clone().unwrap_or(Ok(None))
    }

    async fn create_review(&self, input: CreateReviewInput) -> Result<ReviewView> {
        self.record("create_review");
        self.created.lock().unwrap().push(input);
        self.wait_gate().await;
        self.next_write()
    }

    async fn update_review(&self, id: ReviewId, input: UpdateReviewInput) -> Result<ReviewView> {
        self.record("update_review");
        self.updated.lock().unwrap().push((id, input));
        self.wait_gate().await;
        self.next_write()
    }

    async fn delete_review(&self, _id: ReviewId) -> Result<bool> {
        self.record("delete_review");
        Ok(true)
    }

    async fn mark_helpful(&self, id: ReviewId, helpful: bool) -> Result<HelpfulVote> {
        self.record("mark_helpful");
        Ok(HelpfulVote {
            id,
            helpful_votes: u32::from(helpful),
            is_helpful: helpful,
        })
    }

    async fn update_review_status(
        &self,
        _id: ReviewId,
        _status: ReviewStatus,
    ) -> Result<ReviewView> {
        self.record("update_review_status");
        self.next_write()
    }
}
