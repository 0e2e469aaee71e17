//! Review Presentation Controller
//!
//! Renders the ordered review list and the rating summary for one agent.
//! Sorting is delegated to the store; the star filter is applied locally on
//! the page the store returned, so the two are not symmetric.

use agora_core::{
    AgentId, AggregateRatingStats, PageRequest, RatingBucket, ReviewApi, ReviewPage, ReviewQuery,
    ReviewView, SortBy,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// What the list shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewListOptions {
    pub sort_by: SortBy,
    /// 0 shows every rating, 1..=5 keeps only that star value
    pub filter_rating: u8,
}

impl ReviewListOptions {
    pub fn sorted(sort_by: SortBy) -> Self {
        Self {
            sort_by,
            filter_rating: 0,
        }
    }

    pub fn with_filter(mut self, filter_rating: u8) -> Self {
        self.filter_rating = filter_rating;
        self
    }

    /// Star value to keep, if any. Out-of-range values mean no filter.
    pub fn active_filter(&self) -> Option<u8> {
        (1..=5).contains(&self.filter_rating).then_some(self.filter_rating)
    }
}

/// Aggregate shown above the list
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub count: u64,
    pub distribution: Vec<RatingBucket>,
    /// Computed from the returned page only, because the store sent no aggregate
    pub approximate: bool,
}

impl RatingSummary {
    /// Prefer the store's aggregate; fall back to the page.
    pub fn from_page(page: &ReviewPage) -> Self {
        match (page.average_rating, &page.rating_distribution) {
            (Some(average_rating), Some(distribution)) => Self {
                average_rating,
                count: distribution.iter().map(|b| b.count).sum(),
                distribution: distribution.clone(),
                approximate: false,
            },
            (Some(average_rating), None) => Self {
                average_rating,
                count: page.total_count,
                distribution: Vec::new(),
                approximate: false,
            },
            _ => summarize_page(&page.reviews),
        }
    }

    /// Average rounded to one decimal place
    pub fn display_average(&self) -> f64 {
        (self.average_rating * 10.0).round() / 10.0
    }
}

/// Unweighted mean over the given reviews. Diverges from the true aggregate
/// once results are paginated.
pub fn summarize_page(reviews: &[ReviewView]) -> RatingSummary {
    let stats = AggregateRatingStats::from_ratings(reviews.iter().map(|r| r.rating));
    RatingSummary {
        average_rating: stats.average_rating,
        count: stats.count,
        distribution: stats.rating_distribution,
        approximate: true,
    }
}

/// Renderable outcome of a load
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewListView {
    Loaded {
        reviews: Vec<ReviewView>,
        summary: RatingSummary,
    },
    /// The agent has no reviews at all
    Empty,
    /// Reviews exist but none carry the selected star value
    NoMatches {
        summary: RatingSummary,
        filter_rating: u8,
    },
    /// Store error, raw message
    Failed { message: String },
}

impl ReviewListView {
    pub fn reviews(&self) -> &[ReviewView] {
        match self {
            ReviewListView::Loaded { reviews, .. } => reviews,
            _ => &[],
        }
    }

    pub fn summary(&self) -> Option<&RatingSummary> {
        match self {
            ReviewListView::Loaded { summary, .. } | ReviewListView::NoMatches { summary, .. } => {
                Some(summary)
            }
            _ => None,
        }
    }
}

/// Read-only controller over a `ReviewApi`
pub struct ReviewPresentationController<A: ReviewApi> {
    api: Arc<A>,
    page: PageRequest,
}

impl<A: ReviewApi> ReviewPresentationController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            page: PageRequest::default(),
        }
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// One `get_reviews` round-trip, then local filtering
    pub async fn load(&self, agent_id: &AgentId, options: &ReviewListOptions) -> ReviewListView {
        let query = ReviewQuery::new(agent_id.clone(), options.sort_by).with_page(self.page);

        match self.api.get_reviews(&query).await {
            Ok(page) => {
                debug!(
                    agent_id = %agent_id,
                    sort = %options.sort_by,
                    returned = page.reviews.len(),
                    "Loaded reviews"
                );
                present(page, options)
            }
            Err(e) => {
                warn!("Failed to load reviews for {}: {}", agent_id, e);
                ReviewListView::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Turn a store page into the view for `options`
pub fn present(page: ReviewPage, options: &ReviewListOptions) -> ReviewListView {
    // an empty page past the end is not an agent without reviews
    if page.reviews.is_empty() && page.total_count == 0 {
        return ReviewListView::Empty;
    }

    let summary = RatingSummary::from_page(&page);
    let Some(star) = options.active_filter() else {
        return ReviewListView::Loaded {
            reviews: page.reviews,
            summary,
        };
    };

    let reviews: Vec<ReviewView> = page
        .reviews
        .into_iter()
        .filter(|r| r.rating.value() == star)
        .collect();

    if reviews.is_empty() {
        ReviewListView::NoMatches {
            summary,
            filter_rating: star,
        }
    } else {
        ReviewListView::Loaded { reviews, summary }
    }
}
