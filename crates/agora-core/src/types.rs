//! Review domain types and the wire shapes of the review contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ReviewError;

/// Store-assigned review identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReviewId {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(ReviewId)
            .map_err(|_| ReviewError::not_found(format!("Review {} not found", s)))
    }
}

/// Marketplace agent being reviewed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marketplace user (review author or voter)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating must be between 1 and 5, got {}", value))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

/// Moderation status of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    #[default]
    Published,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "PENDING",
            ReviewStatus::Published => "PUBLISHED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReviewStatus::Pending),
            "PUBLISHED" => Ok(ReviewStatus::Published),
            "REJECTED" => Ok(ReviewStatus::Rejected),
            other => Err(ReviewError::validation(format!("Unknown review status: {}", other))),
        }
    }
}

/// Ordering applied by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    HighestRating,
    LowestRating,
    Helpful,
}

impl SortBy {
    pub const ALL: [SortBy; 5] = [
        SortBy::Newest,
        SortBy::Oldest,
        SortBy::HighestRating,
        SortBy::LowestRating,
        SortBy::Helpful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Newest => "NEWEST",
            SortBy::Oldest => "OLDEST",
            SortBy::HighestRating => "HIGHEST_RATING",
            SortBy::LowestRating => "LOWEST_RATING",
            SortBy::Helpful => "HELPFUL",
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortBy::ALL
            .into_iter()
            .find(|sort| sort.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReviewError::validation(format!("Unknown sort order: {}", s)))
    }
}

/// Page window over an agent's reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Parameters of an `agentReviews` read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    pub agent_id: AgentId,
    pub sort_by: SortBy,
    pub page: PageRequest,
}

impl ReviewQuery {
    pub fn new(agent_id: AgentId, sort_by: SortBy) -> Self {
        Self {
            agent_id,
            sort_by,
            page: PageRequest::default(),
        }
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// Public profile of a review author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A review as consumed by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: ReviewId,
    pub agent_id: AgentId,
    pub rating: Rating,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    pub verified_purchase: bool,
    pub helpful_votes: u32,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub formatted_date: String,
    pub is_helpful: bool,
    pub author: AuthorView,
}

/// Input of `createReview`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewInput {
    pub agent_id: AgentId,
    pub rating: u8,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub verified_purchase: bool,
}

/// Input of `updateReview`: the create shape minus `agentId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewInput {
    pub rating: u8,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub verified_purchase: bool,
}

impl From<CreateReviewInput> for UpdateReviewInput {
    fn from(input: CreateReviewInput) -> Self {
        Self {
            rating: input.rating,
            title: input.title,
            content: input.content,
            pros: input.pros,
            cons: input.cons,
            verified_purchase: input.verified_purchase,
        }
    }
}

/// Count and share of reviews with one star value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBucket {
    pub rating: u8,
    pub count: u64,
    pub percentage: f64,
}

/// Mean, count and distribution over an agent's published reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRatingStats {
    pub average_rating: f64,
    pub count: u64,
    pub rating_distribution: Vec<RatingBucket>,
}

impl AggregateRatingStats {
    /// Build stats from per-star counts; `counts[0]` holds one-star reviews.
    pub fn from_counts(counts: [u64; 5]) -> Self {
        let total: u64 = counts.iter().sum();
        let weighted: u64 = counts
            .iter()
            .enumerate()
            .map(|(i, c)| (i as u64 + 1) * c)
            .sum();

        let average_rating = if total == 0 {
            0.0
        } else {
            weighted as f64 / total as f64
        };

        let rating_distribution = (1..=5u8)
            .rev()
            .map(|star| {
                let count = counts[(star - 1) as usize];
                RatingBucket {
                    rating: star,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect();

        Self {
            average_rating,
            count: total,
            rating_distribution,
        }
    }

    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let mut counts = [0u64; 5];
        for rating in ratings {
            counts[(rating.value() - 1) as usize] += 1;
        }
        Self::from_counts(counts)
    }

    pub fn empty() -> Self {
        Self::from_counts([0; 5])
    }

    /// Average rounded to one decimal place
    pub fn display_average(&self) -> f64 {
        (self.average_rating * 10.0).round() / 10.0
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Result of an `agentReviews` read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<ReviewView>,
    pub total_count: u64,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub rating_distribution: Option<Vec<RatingBucket>>,
}

impl ReviewPage {
    pub fn new(reviews: Vec<ReviewView>, total_count: u64, stats: AggregateRatingStats) -> Self {
        Self {
            reviews,
            total_count,
            average_rating: Some(stats.average_rating),
            rating_distribution: Some(stats.rating_distribution),
        }
    }
}

/// Result of `markReviewHelpful`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpfulVote {
    pub id: ReviewId,
    pub helpful_votes: u32,
    pub is_helpful: bool,
}

/// Body of `markReviewHelpful`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpfulRequest {
    pub helpful: bool,
}

/// Body of `updateReviewStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: ReviewStatus,
}

/// Result of `deleteReview`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
}

/// Render a review timestamp the way listings show it, e.g. `March 5, 2024`
pub fn format_review_date(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert!(Rating::new(6).is_none());
        assert_eq!(Rating::new(5).map(|r| r.value()), Some(5));
        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert_eq!(serde_json::from_str::<Rating>("3").unwrap().value(), 3);
    }

    #[test]
    fn test_sort_by_wire_names() {
        assert_eq!(serde_json::to_string(&SortBy::HighestRating).unwrap(), "\"HIGHEST_RATING\"");
        assert_eq!("helpful".parse::<SortBy>().unwrap(), SortBy::Helpful);
        assert!("RANDOM".parse::<SortBy>().is_err());
        assert_eq!(SortBy::default(), SortBy::Newest);
    }

    #[test]
    fn test_page_request_clamps_limit() {
        assert_eq!(PageRequest::new(0, 0).limit, 1);
        assert_eq!(PageRequest::new(500, 10).limit, PageRequest::MAX_LIMIT);
    }

    #[test]
    fn test_stats_from_counts() {
        // two 5-star, one 4-star, one 1-star
        let stats = AggregateRatingStats::from_counts([1, 0, 0, 1, 2]);
        assert_eq!(stats.count, 4);
        assert!((stats.average_rating - 3.75).abs() < f64::EPSILON);
        assert_eq!(stats.display_average(), 3.8);

        let five = &stats.rating_distribution[0];
        assert_eq!(five.rating, 5);
        assert_eq!(five.count, 2);
        assert_eq!(five.percentage, 50.0);

        let ratings: Vec<u8> = stats.rating_distribution.iter().map(|b| b.rating).collect();
        assert_eq!(ratings, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_empty_stats() {
        let stats = AggregateRatingStats::empty();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.rating_distribution.len(), 5);
        assert!(stats.rating_distribution.iter().all(|b| b.percentage == 0.0));
    }

    #[test]
    fn test_percentage_rounds_to_one_decimal() {
        let stats = AggregateRatingStats::from_counts([0, 0, 1, 1, 1]);
        assert_eq!(stats.rating_distribution[0].percentage, 33.3);
    }

    #[test]
    fn test_format_review_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(format_review_date(&at), "March 5, 2024");
    }

    #[test]
    fn test_create_input_defaults() {
        let input: CreateReviewInput = serde_json::from_value(serde_json::json!({
            "agentId": "agent-1",
            "rating": 4,
            "title": "Solid",
            "content": "Does the job"
        }))
        .unwrap();
        assert!(input.pros.is_empty());
        assert!(!input.verified_purchase);
    }
}
