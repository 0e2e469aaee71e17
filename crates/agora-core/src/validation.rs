//! Field rules for review drafts and inputs
//!
//! The same three checks back two policies: the authoring form stops at the
//! first failing field, the store reports every failing field at once.

use crate::error::{Result, ReviewError};
use crate::text::normalize_entries;
use crate::types::{Rating, UpdateReviewInput};

pub const MSG_RATING_REQUIRED: &str = "Please select a rating.";
pub const MSG_TITLE_REQUIRED: &str = "Please enter a review title.";
pub const MSG_CONTENT_REQUIRED: &str = "Please enter your review.";
pub const MSG_RATING_RANGE: &str = "Rating must be between 1 and 5.";

fn violations(rating: u8, title: &str, content: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    if rating == 0 {
        found.push(MSG_RATING_REQUIRED);
    } else if Rating::new(rating).is_none() {
        found.push(MSG_RATING_RANGE);
    }
    if title.trim().is_empty() {
        found.push(MSG_TITLE_REQUIRED);
    }
    if content.trim().is_empty() {
        found.push(MSG_CONTENT_REQUIRED);
    }
    found
}

/// Fail-fast check: the first failing field wins.
pub fn check_first(rating: u8, title: &str, content: &str) -> Result<()> {
    match violations(rating, title, content).first() {
        Some(msg) => Err(ReviewError::validation(*msg)),
        None => Ok(()),
    }
}

/// Collecting check: every failing field is reported.
pub fn check_all(rating: u8, title: &str, content: &str) -> Result<()> {
    let found = violations(rating, title, content);
    if found.is_empty() {
        Ok(())
    } else {
        Err(ReviewError::validation(found.join(" ")))
    }
}

/// Review fields after validation and normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReview {
    pub rating: Rating,
    pub title: String,
    pub content: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub verified_purchase: bool,
}

impl ValidatedReview {
    pub fn from_input(input: UpdateReviewInput) -> Result<Self> {
        check_all(input.rating, &input.title, &input.content)?;
        let rating = Rating::new(input.rating)
            .ok_or_else(|| ReviewError::validation(MSG_RATING_RANGE))?;

        Ok(Self {
            rating,
            title: input.title.trim().to_string(),
            content: input.content.trim().to_string(),
            pros: normalize_entries(&input.pros),
            cons: normalize_entries(&input.cons),
            verified_purchase: input.verified_purchase,
        })
    }
}
