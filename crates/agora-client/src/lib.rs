//! Agora review client
//!
//! Controllers that drive a review UI against any `ReviewApi`:
//! - `presentation`: sorted list, local star filter and the rating summary
//! - `authoring`: create-or-edit form state machine
//! - `http`: `ReviewApi` over the agora-web JSON endpoints

pub mod authoring;
pub mod http;
pub mod presentation;

#[cfg(test)]
pub(crate) mod testing;

pub use authoring::{
    AuthoringError, AuthoringState, ReviewAuthoringController, ReviewDraft, SubmitOutcome,
};
pub use http::HttpReviewApi;
pub use presentation::{
    summarize_page, RatingSummary, ReviewListOptions, ReviewListView, ReviewPresentationController,
};
