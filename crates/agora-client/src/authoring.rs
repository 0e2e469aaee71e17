//! Review Authoring Controller
//!
//! Create-or-edit form state machine:
//!
//! ```text
//! Idle ──begin_write(existing)──▶ Editing ──submit──▶ Submitting ──ok──▶ Idle
//!   │                                                     │
//!   └───────────────submit───────────────────────────────┘ └──err──▶ Error
//! ```
//!
//! Validation runs before any network call and stops at the first failing
//! field. While a submission is in flight further submits are refused, which
//! keeps one form from racing itself into a duplicate create. The guard holds
//! until the response arrives, even if the form is cancelled or re-entered
//! meanwhile; that late response is then dropped.
//!
//! `NOT_FOUND` on a write means the review is gone: listings are told to
//! re-fetch and the form stops pointing at the missing review.

use agora_core::validation::check_first;
use agora_core::{
    lines_to_list, list_to_lines, AgentId, CreateReviewInput, ErrorCode, HelpfulVote, Identity,
    Result, ReviewApi, ReviewError, ReviewId, ReviewView, UpdateReviewInput,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Form fields as the user typed them
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewDraft {
    /// 0 until a star is selected
    pub rating: u8,
    pub title: String,
    pub content: String,
    /// One entry per line
    pub pros_text: String,
    pub cons_text: String,
    pub verified_purchase: bool,
}

impl ReviewDraft {
    pub fn from_review(review: &ReviewView) -> Self {
        Self {
            rating: review.rating.value(),
            title: review.title.clone(),
            content: review.content.clone(),
            pros_text: list_to_lines(&review.pros),
            cons_text: list_to_lines(&review.cons),
            verified_purchase: review.verified_purchase,
        }
    }

    /// Fail-fast: rating, then title, then content
    pub fn validate(&self) -> Result<()> {
        check_first(self.rating, &self.title, &self.content)
    }

    pub fn to_update_input(&self) -> UpdateReviewInput {
        UpdateReviewInput {
            rating: self.rating,
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            pros: lines_to_list(&self.pros_text),
            cons: lines_to_list(&self.cons_text),
            verified_purchase: self.verified_purchase,
        }
    }

    pub fn to_create_input(&self, agent_id: &AgentId) -> CreateReviewInput {
        let fields = self.to_update_input();
        CreateReviewInput {
            agent_id: agent_id.clone(),
            rating: fields.rating,
            title: fields.title,
            content: fields.content,
            pros: fields.pros,
            cons: fields.cons,
            verified_purchase: fields.verified_purchase,
        }
    }
}

/// Failure surfaced by the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoringError {
    pub kind: ErrorCode,
    /// Shown verbatim
    pub message: String,
}

impl AuthoringError {
    /// The user already has a review for this agent and can switch to editing it
    pub fn offers_edit_existing(&self) -> bool {
        self.kind == ErrorCode::DuplicateReview
    }

    /// Resubmitting the same draft may succeed
    pub fn can_retry(&self) -> bool {
        matches!(self.kind, ErrorCode::Network | ErrorCode::Unknown)
    }

    pub fn needs_login(&self) -> bool {
        self.kind == ErrorCode::Unauthenticated
    }

    /// The review disappeared underneath the form; the list is stale
    pub fn needs_refresh(&self) -> bool {
        self.kind == ErrorCode::NotFound
    }
}

impl From<&ReviewError> for AuthoringError {
    fn from(err: &ReviewError) -> Self {
        Self {
            kind: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<ReviewError> for AuthoringError {
    fn from(err: ReviewError) -> Self {
        Self::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthoringState {
    Idle,
    Editing(ReviewView),
    Submitting,
    Error(AuthoringError),
}

impl AuthoringState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, AuthoringState::Submitting)
    }
}

/// Result of `submit`
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved(ReviewView),
    Failed(AuthoringError),
    /// A submission is already in flight; nothing was sent
    AlreadySubmitting,
}

struct Form {
    state: AuthoringState,
    draft: ReviewDraft,
    /// Review being edited; survives an Error so a retry edits rather than creates
    target: Option<ReviewView>,
    /// Bumped after every successful write, or a write that found the review
    /// gone, so listings know to re-fetch
    refresh_generation: u64,
    /// A create or update is awaiting its response; cleared only by that response
    in_flight: bool,
    /// Bumped on every entry or cancel; stale responses compare against it
    epoch: u64,
}

impl Form {
    fn reset(&mut self) {
        self.state = AuthoringState::Idle;
        self.draft = ReviewDraft::default();
        self.target = None;
        self.epoch += 1;
    }

    fn fail(&mut self, err: AuthoringError) -> AuthoringError {
        self.state = AuthoringState::Error(err.clone());
        err
    }
}

pub struct ReviewAuthoringController<A: ReviewApi> {
    api: Arc<A>,
    form: Mutex<Form>,
}

impl<A: ReviewApi> ReviewAuthoringController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            form: Mutex::new(Form {
                state: AuthoringState::Idle,
                draft: ReviewDraft::default(),
                target: None,
                refresh_generation: 0,
                in_flight: false,
                epoch: 0,
            }),
        }
    }

    pub async fn state(&self) -> AuthoringState {
        self.form.lock().await.state.clone()
    }

    pub async fn draft(&self) -> ReviewDraft {
        self.form.lock().await.draft.clone()
    }

    pub async fn refresh_generation(&self) -> u64 {
        self.form.lock().await.refresh_generation
    }

    /// Apply an edit to the draft. Ignored while submitting.
    pub async fn edit_draft<F>(&self, edit: F)
    where
        F: FnOnce(&mut ReviewDraft),
    {
        let mut form = self.form.lock().await;
        if !form.state.is_submitting() {
            edit(&mut form.draft);
        }
    }

    /// "Write a review": switches to editing when the user already has one
    pub async fn begin_write(
        &self,
        current_user: Option<&Identity>,
        agent_id: &AgentId,
    ) -> std::result::Result<(), AuthoringError> {
        if current_user.is_none() {
            return Err(ReviewError::Unauthenticated.into());
        }

        let epoch = {
            let mut form = self.form.lock().await;
            form.reset();
            form.epoch
        };

        let existing = self.api.get_user_review(agent_id).await;

        let mut form = self.form.lock().await;
        if form.epoch != epoch {
            debug!("Discarding stale user review lookup for {}", agent_id);
            return Ok(());
        }
        match existing {
            Ok(Some(review)) => {
                debug!(review_id = %review.id, agent_id = %agent_id, "Editing existing review");
                form.draft = ReviewDraft::from_review(&review);
                form.target = Some(review.clone());
                form.state = AuthoringState::Editing(review);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(form.fail(e.into())),
        }
    }

    /// "Edit" on a list item: only for the user's own review
    pub async fn begin_edit(
        &self,
        current_user: Option<&Identity>,
        review: ReviewView,
    ) -> std::result::Result<(), AuthoringError> {
        let user = current_user.ok_or(AuthoringError::from(ReviewError::Unauthenticated))?;
        if review.author.id != user.user_id {
            return Err(ReviewError::forbidden("You can only edit your own reviews.").into());
        }

        let mut form = self.form.lock().await;
        form.reset();
        form.draft = ReviewDraft::from_review(&review);
        form.target = Some(review.clone());
        form.state = AuthoringState::Editing(review);
        Ok(())
    }

    /// Validate the draft, then create or update
    pub async fn submit(
        &self,
        current_user: Option<&Identity>,
        agent_id: &AgentId,
    ) -> SubmitOutcome {
        let (draft, target, epoch) = {
            let mut form = self.form.lock().await;
            if form.in_flight {
                debug!("Submit ignored: submission already in flight");
                return SubmitOutcome::AlreadySubmitting;
            }
            if current_user.is_none() {
                return SubmitOutcome::Failed(form.fail(ReviewError::Unauthenticated.into()));
            }
            if let Err(e) = form.draft.validate() {
                return SubmitOutcome::Failed(form.fail(e.into()));
            }
            form.state = AuthoringState::Submitting;
            form.in_flight = true;
            (form.draft.clone(), form.target.clone(), form.epoch)
        };

        let result = match &target {
            Some(existing) => self.api.update_review(existing.id, draft.to_update_input()).await,
            None => self.api.create_review(draft.to_create_input(agent_id)).await,
        };

        let mut form = self.form.lock().await;
        form.in_flight = false;
        let current = form.epoch == epoch && form.state.is_submitting();
        match result {
            Ok(review) => {
                form.refresh_generation += 1;
                if current {
                    form.reset();
                }
                info!(review_id = %review.id, agent_id = %agent_id, "Review saved");
                SubmitOutcome::Saved(review)
            }
            Err(e) => {
                let err = AuthoringError::from(&e);
                warn!("Review submission failed: {}", e);
                if err.needs_refresh() {
                    form.refresh_generation += 1;
                }
                if current {
                    if err.needs_refresh() {
                        // next submit creates instead of updating a missing review
                        form.target = None;
                    }
                    form.state = AuthoringState::Error(err.clone());
                }
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Discard the draft without a network call. A submission already in
    /// flight still blocks new submits until it answers.
    pub async fn cancel(&self) {
        self.form.lock().await.reset();
    }

    pub async fn delete(
        &self,
        current_user: Option<&Identity>,
        review_id: ReviewId,
    ) -> std::result::Result<bool, AuthoringError> {
        if current_user.is_none() {
            return Err(ReviewError::Unauthenticated.into());
        }

        let result = self.api.delete_review(review_id).await;

        let mut form = self.form.lock().await;
        // NOT_FOUND leaves the same end state as a successful delete
        let gone = match &result {
            Ok(_) => true,
            Err(e) => e.code() == ErrorCode::NotFound,
        };
        if gone {
            form.refresh_generation += 1;
            if form.target.as_ref().is_some_and(|t| t.id == review_id) {
                form.reset();
            }
        }
        let deleted = result?;
        info!(review_id = %review_id, "Review deleted");
        Ok(deleted)
    }

    pub async fn vote_helpful(
        &self,
        current_user: Option<&Identity>,
        review_id: ReviewId,
        helpful: bool,
    ) -> std::result::Result<HelpfulVote, AuthoringError> {
        if current_user.is_none() {
            return Err(ReviewError::Unauthenticated.into());
        }
        Ok(self.api.mark_helpful(review_id, helpful).await?)
    }
}
