//! SQLite-based review store
//!
//! Authority for the one-review-per-(agent, author) invariant, helpfulness
//! vote deduplication and moderation status. Rating aggregates are computed
//! from the reviews table on every read, so any create, edit, status change
//! or delete shows up in the next `get_reviews`.

use crate::error::{Result, StoreError};
use crate::metrics::{
    self, OperationTimer, REVIEWS_CREATED_TOTAL, REVIEWS_DELETED_TOTAL, REVIEWS_UPDATED_TOTAL,
};
use crate::review_store::{ReviewStore, StorePolicy};
use agora_core::types::format_review_date;
use agora_core::{
    require_identity, AgentId, AggregateRatingStats, AuthorView, CreateReviewInput, HelpfulVote,
    Identity, Rating, ReviewError, ReviewId, ReviewPage, ReviewQuery, ReviewStatus, ReviewView,
    SortBy, UpdateReviewInput, UserId, ValidatedReview,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const REVIEW_COLUMNS: &str = r#"
    r.id, r.agent_id, r.author_id, r.rating, r.title, r.content, r.pros, r.cons,
    r.verified_purchase, r.helpful_votes, r.status, r.created_at, r.updated_at,
    u.username AS author_username, u.avatar AS author_avatar,
    EXISTS(
        SELECT 1 FROM review_votes v WHERE v.review_id = r.id AND v.voter_id = ?
    ) AS is_helpful
"#;

/// SQLite-backed review store
pub struct SqliteReviewStore {
    pool: SqlitePool,
    policy: StorePolicy,
}

impl SqliteReviewStore {
    /// Open (creating if missing) the database at `url`
    ///
    /// URL format: `sqlite:///path/to/reviews.db` or `sqlite::memory:`
    pub async fn new(url: &str, policy: StorePolicy) -> Result<Self> {
        info!("Initializing SQLite review store: {}", url);

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, policy).await
    }

    /// In-memory store for tests, auto-publishing
    pub async fn in_memory() -> Result<Self> {
        Self::in_memory_with_policy(StorePolicy::default()).await
    }

    /// In-memory store for tests. A single long-lived connection keeps the
    /// database alive for the lifetime of the pool.
    pub async fn in_memory_with_policy(policy: StorePolicy) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, policy).await
    }

    async fn with_pool(pool: SqlitePool, policy: StorePolicy) -> Result<Self> {
        metrics::register_metrics();
        let store = Self { pool, policy };
        store.initialize_schema().await?;
        info!(
            "SQLite review store ready (auto_publish={})",
            store.policy.auto_publish
        );
        Ok(store)
    }

    pub fn policy(&self) -> StorePolicy {
        self.policy
    }

    /// Round-trip to the database, used by health checks
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Wait for in-use connections to be returned, then close the pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Review store closed");
    }

    async fn initialize_schema(&self) -> Result<()> {
        debug!("Initializing review schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                avatar TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                pros TEXT NOT NULL,
                cons TEXT NOT NULL,
                verified_purchase INTEGER NOT NULL,
                helpful_votes INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (agent_id, author_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS review_votes (
                review_id TEXT NOT NULL,
                voter_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (review_id, voter_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reviews_agent_status ON reviews(agent_id, status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_created ON reviews(created_at)")
            .execute(&self.pool)
            .await?;

        debug!("Review schema initialized");
        Ok(())
    }

    async fn fetch_view(
        &self,
        id: ReviewId,
        viewer: Option<&UserId>,
    ) -> Result<Option<ReviewView>> {
        let sql = format!(
            "SELECT {} FROM reviews r LEFT JOIN users u ON u.id = r.author_id WHERE r.id = ?",
            REVIEW_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(viewer.map(UserId::as_str))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_view).transpose()
    }

    /// Load a review the caller is allowed to see, NOT_FOUND otherwise
    async fn visible_review(&self, caller: &Identity, id: ReviewId) -> Result<ReviewView> {
        match self.fetch_view(id, Some(&caller.user_id)).await? {
            Some(view) if can_see(Some(caller), &view) => Ok(view),
            _ => Err(review_not_found(id)),
        }
    }

    async fn reload(&self, id: ReviewId, viewer: &UserId) -> Result<ReviewView> {
        self.fetch_view(id, Some(viewer))
            .await?
            .ok_or_else(|| review_not_found(id))
    }

    async fn create_inner(
        &self,
        caller: Option<&Identity>,
        input: CreateReviewInput,
    ) -> Result<ReviewView> {
        let identity = require_identity(caller)?;
        let agent_id = AgentId::new(input.agent_id.as_str().trim());
        if agent_id.as_str().is_empty() {
            return Err(ReviewError::validation("Please choose an agent to review.").into());
        }
        let fields = ValidatedReview::from_input(input.into())?;

        let id = ReviewId::new();
        let now = ts(&Utc::now());
        let status = if self.policy.auto_publish {
            ReviewStatus::Published
        } else {
            ReviewStatus::Pending
        };

        let mut tx = self.pool.begin().await?;

        // First statement is a write so the transaction holds the write lock
        // before the duplicate check runs.
        upsert_user(&mut tx, identity, &now).await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM reviews WHERE agent_id = ? AND author_id = ?")
                .bind(agent_id.as_str())
                .bind(identity.user_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(duplicate(&agent_id));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO reviews (
                id, agent_id, author_id, rating, title, content, pros, cons,
                verified_purchase, helpful_votes, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(agent_id.as_str())
        .bind(identity.user_id.as_str())
        .bind(fields.rating.value() as i64)
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(serde_json::to_string(&fields.pros)?)
        .bind(serde_json::to_string(&fields.cons)?)
        .bind(fields.verified_purchase)
        .bind(status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(duplicate(&agent_id));
            }
            return Err(e.into());
        }

        tx.commit().await?;
        REVIEWS_CREATED_TOTAL.inc();
        info!(
            review_id = %id,
            agent_id = %agent_id,
            author = %identity.user_id,
            status = %status,
            "Review created"
        );

        self.reload(id, &identity.user_id).await
    }

    async fn update_inner(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        input: UpdateReviewInput,
    ) -> Result<ReviewView> {
        let identity = require_identity(caller)?;
        let current = self.visible_review(identity, id).await?;

        let is_author = current.author.id == identity.user_id;
        if !is_author && !identity.is_moderator() {
            return Err(ReviewError::forbidden("You can only edit your own reviews.").into());
        }
        let fields = ValidatedReview::from_input(input)?;

        let status = if is_author && !identity.is_moderator() && !self.policy.auto_publish {
            ReviewStatus::Pending
        } else {
            current.status
        };
        let now = ts(&Utc::now());

        let mut tx = self.pool.begin().await?;
        if is_author {
            upsert_user(&mut tx, identity, &now).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE reviews
            SET rating = ?, title = ?, content = ?, pros = ?, cons = ?,
                verified_purchase = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fields.rating.value() as i64)
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(serde_json::to_string(&fields.pros)?)
        .bind(serde_json::to_string(&fields.cons)?)
        .bind(fields.verified_purchase)
        .bind(status.as_str())
        .bind(&now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!("Review {} vanished before update", id);
            return Err(review_not_found(id));
        }
        tx.commit().await?;

        if status != current.status {
            metrics::record_status_transition(current.status.as_str(), status.as_str());
        }
        REVIEWS_UPDATED_TOTAL.inc();
        debug!(review_id = %id, editor = %identity.user_id, "Review updated");

        self.reload(id, &identity.user_id).await
    }

    async fn delete_inner(&self, caller: Option<&Identity>, id: ReviewId) -> Result<bool> {
        let identity = require_identity(caller)?;
        let current = self.visible_review(identity, id).await?;

        if current.author.id != identity.user_id && !identity.is_moderator() {
            return Err(ReviewError::forbidden("You can only delete your own reviews.").into());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM review_votes WHERE review_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(review_not_found(id));
        }
        tx.commit().await?;

        REVIEWS_DELETED_TOTAL.inc();
        info!(
            review_id = %id,
            agent_id = %current.agent_id,
            by = %identity.user_id,
            "Review deleted"
        );
        Ok(true)
    }

    async fn mark_helpful_inner(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        helpful: bool,
    ) -> Result<HelpfulVote> {
        let identity = require_identity(caller)?;
        self.visible_review(identity, id).await?;

        let mut tx = self.pool.begin().await?;
        let outcome = if helpful {
            sqlx::query(
                "INSERT OR IGNORE INTO review_votes (review_id, voter_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(identity.user_id.as_str())
            .bind(ts(&Utc::now()))
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query("DELETE FROM review_votes WHERE review_id = ? AND voter_id = ?")
                .bind(id.to_string())
                .bind(identity.user_id.as_str())
                .execute(&mut *tx)
                .await?
        };
        let changed = outcome.rows_affected() > 0;

        sqlx::query(
            "UPDATE reviews SET helpful_votes = (SELECT COUNT(*) FROM review_votes WHERE review_id = ?) WHERE id = ?",
        )
        .bind(id.to_string())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        let votes: Option<i64> =
            sqlx::query_scalar("SELECT helpful_votes FROM reviews WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
        let votes = votes.ok_or_else(|| review_not_found(id))?;
        tx.commit().await?;

        metrics::record_helpful_vote(helpful, changed);
        debug!(
            review_id = %id,
            voter = %identity.user_id,
            helpful,
            changed,
            votes,
            "Helpful vote applied"
        );

        Ok(HelpfulVote {
            id,
            helpful_votes: votes.max(0) as u32,
            is_helpful: helpful,
        })
    }

    async fn update_status_inner(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        status: ReviewStatus,
    ) -> Result<ReviewView> {
        let identity = require_identity(caller)?;
        if !identity.is_moderator() {
            return Err(ReviewError::forbidden("Only moderators can change review status.").into());
        }

        let current = self
            .fetch_view(id, Some(&identity.user_id))
            .await?
            .ok_or_else(|| review_not_found(id))?;
        if current.status == status {
            return Ok(current);
        }

        let result = sqlx::query("UPDATE reviews SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(ts(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(review_not_found(id));
        }

        metrics::record_status_transition(current.status.as_str(), status.as_str());
        info!(
            review_id = %id,
            from = %current.status,
            to = %status,
            moderator = %identity.user_id,
            "Review status changed"
        );

        self.reload(id, &identity.user_id).await
    }
}

#[async_trait]
impl ReviewStore for SqliteReviewStore {
    async fn get_reviews(
        &self,
        caller: Option<&Identity>,
        query: &ReviewQuery,
    ) -> Result<ReviewPage> {
        let _timer = OperationTimer::new("get_reviews");
        let include_all = caller.map(Identity::is_moderator).unwrap_or(false);
        let viewer = caller.map(|c| c.user_id.as_str());

        // One read transaction so the page, the count and the aggregate agree.
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM reviews r LEFT JOIN users u ON u.id = r.author_id \
             WHERE r.agent_id = ? AND (? OR r.status = 'PUBLISHED') \
             ORDER BY {} LIMIT ? OFFSET ?",
            REVIEW_COLUMNS,
            order_clause(query.sort_by)
        );
        let rows = sqlx::query(&sql)
            .bind(viewer)
            .bind(query.agent_id.as_str())
            .bind(include_all)
            .bind(query.page.limit as i64)
            .bind(query.page.offset as i64)
            .fetch_all(&mut *tx)
            .await?;
        let reviews = rows.iter().map(row_to_view).collect::<Result<Vec<_>>>()?;

        let total_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE agent_id = ? AND (? OR status = 'PUBLISHED')",
        )
        .bind(query.agent_id.as_str())
        .bind(include_all)
        .fetch_one(&mut *tx)
        .await?;

        let stats = stats_for(&mut tx, &query.agent_id).await?;
        tx.commit().await?;

        debug!(
            agent_id = %query.agent_id,
            sort = %query.sort_by,
            returned = reviews.len(),
            total_count,
            "Listed reviews"
        );
        Ok(ReviewPage::new(reviews, total_count.max(0) as u64, stats))
    }

    async fn rating_stats(&self, agent_id: &AgentId) -> Result<AggregateRatingStats> {
        let _timer = OperationTimer::new("rating_stats");
        let mut conn = self.pool.acquire().await?;
        stats_for(&mut conn, agent_id).await
    }

    async fn get_user_review(
        &self,
        caller: Option<&Identity>,
        agent_id: &AgentId,
    ) -> Result<Option<ReviewView>> {
        let _timer = OperationTimer::new("get_user_review");
        let identity = require_identity(caller)?;

        let sql = format!(
            "SELECT {} FROM reviews r LEFT JOIN users u ON u.id = r.author_id \
             WHERE r.agent_id = ? AND r.author_id = ?",
            REVIEW_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(identity.user_id.as_str())
            .bind(agent_id.as_str())
            .bind(identity.user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_view).transpose()
    }

    async fn create_review(
        &self,
        caller: Option<&Identity>,
        input: CreateReviewInput,
    ) -> Result<ReviewView> {
        let _timer = OperationTimer::new("create_review");
        let result = self.create_inner(caller, input).await;
        observe_write("create_review", &result);
        result
    }

    async fn update_review(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        input: UpdateReviewInput,
    ) -> Result<ReviewView> {
        let _timer = OperationTimer::new("update_review");
        let result = self.update_inner(caller, id, input).await;
        observe_write("update_review", &result);
        result
    }

    async fn delete_review(&self, caller: Option<&Identity>, id: ReviewId) -> Result<bool> {
        let _timer = OperationTimer::new("delete_review");
        let result = self.delete_inner(caller, id).await;
        observe_write("delete_review", &result);
        result
    }

    async fn mark_helpful(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        helpful: bool,
    ) -> Result<HelpfulVote> {
        let _timer = OperationTimer::new("mark_helpful");
        let result = self.mark_helpful_inner(caller, id, helpful).await;
        observe_write("mark_helpful", &result);
        result
    }

    async fn update_review_status(
        &self,
        caller: Option<&Identity>,
        id: ReviewId,
        status: ReviewStatus,
    ) -> Result<ReviewView> {
        let _timer = OperationTimer::new("update_review_status");
        let result = self.update_status_inner(caller, id, status).await;
        observe_write("update_review_status", &result);
        result
    }
}

async fn upsert_user(conn: &mut SqliteConnection, identity: &Identity, now: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, avatar, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            avatar = excluded.avatar,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(identity.user_id.as_str())
    .bind(&identity.username)
    .bind(identity.avatar.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn stats_for(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
) -> Result<AggregateRatingStats> {
    let rows = sqlx::query(
        "SELECT rating, COUNT(*) AS n FROM reviews WHERE agent_id = ? AND status = 'PUBLISHED' GROUP BY rating",
    )
    .bind(agent_id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    let mut counts = [0u64; 5];
    for row in rows {
        let rating: i64 = row.try_get("rating")?;
        let n: i64 = row.try_get("n")?;
        if (1..=5).contains(&rating) {
            counts[(rating - 1) as usize] = n.max(0) as u64;
        }
    }
    Ok(AggregateRatingStats::from_counts(counts))
}

/// Record rejected writes; infrastructure failures are logged by the error conversion.
fn observe_write<T>(operation: &'static str, result: &Result<T>) {
    if let Err(StoreError::Review(e)) = result {
        warn!("{} rejected: {} ({})", operation, e, e.code());
        metrics::record_rejected_write(operation, e.code().as_str());
    }
}

fn can_see(caller: Option<&Identity>, review: &ReviewView) -> bool {
    review.status == ReviewStatus::Published
        || caller.is_some_and(|c| c.is_moderator() || c.user_id == review.author.id)
}

fn order_clause(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::Newest => "r.created_at DESC, r.id DESC",
        SortBy::Oldest => "r.created_at ASC, r.id ASC",
        SortBy::HighestRating => "r.rating DESC, r.created_at DESC, r.id DESC",
        SortBy::LowestRating => "r.rating ASC, r.created_at DESC, r.id DESC",
        SortBy::Helpful => "r.helpful_votes DESC, r.created_at DESC, r.id DESC",
    }
}

fn review_not_found(id: ReviewId) -> StoreError {
    ReviewError::not_found(format!("Review {} not found", id)).into()
}

fn duplicate(agent_id: &AgentId) -> StoreError {
    ReviewError::Duplicate {
        agent_id: agent_id.to_string(),
    }
    .into()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {}: {}", raw, e)))
}

fn row_to_view(row: &SqliteRow) -> Result<ReviewView> {
    let id_str: String = row.try_get("id")?;
    let id = ReviewId(
        uuid::Uuid::parse_str(&id_str)
            .map_err(|e| StoreError::Corrupt(format!("bad review id {}: {}", id_str, e)))?,
    );

    let rating_raw: i64 = row.try_get("rating")?;
    let rating = u8::try_from(rating_raw)
        .ok()
        .and_then(Rating::new)
        .ok_or_else(|| StoreError::Corrupt(format!("review {} has rating {}", id, rating_raw)))?;

    let status_raw: String = row.try_get("status")?;
    let status = status_raw
        .parse::<ReviewStatus>()
        .map_err(|_| StoreError::Corrupt(format!("review {} has status {}", id, status_raw)))?;

    let pros_json: String = row.try_get("pros")?;
    let cons_json: String = row.try_get("cons")?;
    let created_at = parse_ts(&row.try_get::<String, _>("created_at")?)?;
    let updated_at = parse_ts(&row.try_get::<String, _>("updated_at")?)?;

    let author_id: String = row.try_get("author_id")?;
    let username: Option<String> = row.try_get("author_username")?;
    let avatar: Option<String> = row.try_get("author_avatar")?;

    let verified_purchase: i64 = row.try_get("verified_purchase")?;
    let helpful_votes: i64 = row.try_get("helpful_votes")?;
    let is_helpful: i64 = row.try_get_unchecked("is_helpful")?;

    Ok(ReviewView {
        id,
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        rating,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        pros: serde_json::from_str(&pros_json)?,
        cons: serde_json::from_str(&cons_json)?,
        verified_purchase: verified_purchase != 0,
        helpful_votes: helpful_votes.max(0) as u32,
        status,
        formatted_date: format_review_date(&created_at),
        created_at,
        updated_at,
        is_helpful: is_helpful != 0,
        author: AuthorView {
            username: username.unwrap_or_else(|| author_id.clone()),
            id: UserId::new(author_id),
            avatar,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::PageRequest;
    use std::sync::Arc;

    fn alice() -> Identity {
        Identity::user("u-alice", "alice").with_avatar("https://cdn.example/alice.png")
    }

    fn bob() -> Identity {
        Identity::user("u-bob", "bob")
    }

    fn moderator() -> Identity {
        Identity::moderator("u-mod", "mod")
    }

    fn input(agent: &str, rating: u8, title: &str, content: &str) -> CreateReviewInput {
        CreateReviewInput {
            agent_id: AgentId::new(agent),
            rating,
            title: title.to_string(),
            content: content.to_string(),
            pros: vec![],
            cons: vec![],
            verified_purchase: false,
        }
    }

    fn edit(rating: u8, title: &str, content: &str) -> UpdateReviewInput {
        input("ignored", rating, title, content).into()
    }

    fn code_of<T: std::fmt::Debug>(result: Result<T>) -> &'static str {
        match result {
            Err(e) => e.code().as_str(),
            Ok(v) => panic!("expected an error, got {:?}", v),
        }
    }

    async fn list(
        store: &SqliteReviewStore,
        caller: Option<&Identity>,
        agent: &str,
        sort: SortBy,
    ) -> ReviewPage {
        store
            .get_reviews(caller, &ReviewQuery::new(AgentId::new(agent), sort))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_user_review() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();

        let mut raw = input("agent-x", 4, "  Solid agent ", "Handles my tickets");
        raw.cons = vec!["Slow start".into()];
        raw.verified_purchase = true;
        let created = store.create_review(Some(&alice), raw).await.unwrap();

        let found = store
            .get_user_review(Some(&alice), &AgentId::new("agent-x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.rating.value(), 4);
        assert_eq!(found.title, "Solid agent");
        assert_eq!(found.content, "Handles my tickets");
        assert_eq!(found.cons, vec!["Slow start"]);
        assert!(found.verified_purchase);
        assert_eq!(found.status, ReviewStatus::Published);
        assert_eq!(found.author.username, "alice");
        assert_eq!(found.author.avatar.as_deref(), Some("https://cdn.example/alice.png"));
        assert_eq!(found.formatted_date, format_review_date(&found.created_at));

        let none = store
            .get_user_review(Some(&bob()), &AgentId::new("agent-x"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected_and_existing_kept() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();

        let first = store
            .create_review(Some(&alice), input("agent-x", 5, "Great", "Works well"))
            .await
            .unwrap();
        let second = store
            .create_review(Some(&alice), input("agent-x", 1, "Changed", "Mind"))
            .await;
        assert_eq!(code_of(second), "DUPLICATE_REVIEW");

        let kept = store
            .get_user_review(Some(&alice), &AgentId::new("agent-x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.id, first.id);
        assert_eq!(kept.rating.value(), 5);
        assert_eq!(kept.title, "Great");

        // a different agent is fine
        store
            .create_review(Some(&alice), input("agent-y", 3, "Ok", "Fine"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_creates_yield_one_review() {
        let store = Arc::new(SqliteReviewStore::in_memory().await.unwrap());
        let alice = alice();

        let (a, b) = tokio::join!(
            store.create_review(Some(&alice), input("agent-x", 5, "Tab one", "First")),
            store.create_review(Some(&alice), input("agent-x", 4, "Tab two", "Second")),
        );
        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let failed = if a.is_err() { a } else { b };
        assert_eq!(code_of(failed), "DUPLICATE_REVIEW");

        let page = list(&store, None, "agent-x", SortBy::Newest).await;
        assert_eq!(page.total_count, 1);
    }

    #[tokio::test]
    async fn test_create_requires_identity_and_valid_fields() {
        let store = SqliteReviewStore::in_memory().await.unwrap();

        let anon = store
            .create_review(None, input("agent-x", 5, "Great", "Works"))
            .await;
        assert_eq!(code_of(anon), "UNAUTHENTICATED");

        let alice = alice();
        for bad in [
            input("agent-x", 0, "Great", "Works"),
            input("agent-x", 6, "Great", "Works"),
            input("agent-x", 5, "   ", "Works"),
            input("agent-x", 5, "Great", ""),
            input("  ", 5, "Great", "Works"),
        ] {
            let result = store.create_review(Some(&alice), bad).await;
            assert_eq!(code_of(result), "VALIDATION_ERROR");
        }

        let page = list(&store, None, "agent-x", SortBy::Newest).await;
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_pros_and_cons_are_normalized() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let mut raw = input("agent-x", 5, "Great", "Works well");
        raw.pros = vec!["".into(), "  ".into(), "Fast".into()];
        raw.cons = vec!["  Pricey ".into(), "\t".into()];

        let created = store.create_review(Some(&alice()), raw).await.unwrap();
        assert_eq!(created.pros, vec!["Fast"]);
        assert_eq!(created.cons, vec!["Pricey"]);
    }

    #[tokio::test]
    async fn test_rating_sorts_are_monotonic() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        for (i, rating) in [3u8, 5, 1, 4, 2, 5].into_iter().enumerate() {
            let user = Identity::user(format!("u-{}", i), format!("user{}", i));
            store
                .create_review(Some(&user), input("agent-x", rating, "Title", "Body"))
                .await
                .unwrap();
        }

        let highest = list(&store, None, "agent-x", SortBy::HighestRating).await;
        let ratings: Vec<u8> = highest.reviews.iter().map(|r| r.rating.value()).collect();
        assert!(ratings.windows(2).all(|w| w[0] >= w[1]), "{:?}", ratings);

        let lowest = list(&store, None, "agent-x", SortBy::LowestRating).await;
        let ratings: Vec<u8> = lowest.reviews.iter().map(|r| r.rating.value()).collect();
        assert!(ratings.windows(2).all(|w| w[0] <= w[1]), "{:?}", ratings);

        let newest = list(&store, None, "agent-x", SortBy::Newest).await;
        assert!(newest
            .reviews
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));

        let oldest = list(&store, None, "agent-x", SortBy::Oldest).await;
        assert!(oldest
            .reviews
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_helpful_sort_orders_by_votes() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();
        let bob = bob();

        let quiet = store
            .create_review(Some(&alice), input("agent-x", 4, "Quiet", "Nobody voted"))
            .await
            .unwrap();
        let popular = store
            .create_review(Some(&bob), input("agent-x", 2, "Popular", "Everyone voted"))
            .await
            .unwrap();
        for i in 0..3 {
            let voter = Identity::user(format!("voter-{}", i), "voter");
            store.mark_helpful(Some(&voter), popular.id, true).await.unwrap();
        }

        let page = list(&store, None, "agent-x", SortBy::Helpful).await;
        assert_eq!(page.reviews[0].id, popular.id);
        assert_eq!(page.reviews[0].helpful_votes, 3);
        assert_eq!(page.reviews[1].id, quiet.id);
    }

    #[tokio::test]
    async fn test_delete_recomputes_aggregate() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();
        let bob = bob();

        store
            .create_review(Some(&alice), input("agent-x", 5, "Great", "Works"))
            .await
            .unwrap();
        let bad = store
            .create_review(Some(&bob), input("agent-x", 1, "Bad", "Broke"))
            .await
            .unwrap();

        let before = list(&store, None, "agent-x", SortBy::Newest).await;
        assert_eq!(before.total_count, 2);
        assert_eq!(before.average_rating, Some(3.0));

        assert!(store.delete_review(Some(&bob), bad.id).await.unwrap());

        let after = list(&store, None, "agent-x", SortBy::Newest).await;
        assert_eq!(after.total_count, before.total_count - 1);
        assert_eq!(after.average_rating, Some(5.0));
        let one_star = after
            .rating_distribution
            .unwrap()
            .into_iter()
            .find(|b| b.rating == 1)
            .unwrap();
        assert_eq!(one_star.count, 0);

        let again = store.delete_review(Some(&bob), bad.id).await;
        assert_eq!(code_of(again), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_empty_agent_has_zero_average() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let page = list(&store, None, "agent-none", SortBy::Newest).await;
        assert!(page.reviews.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.average_rating, Some(0.0));

        let stats = store.rating_stats(&AgentId::new("agent-none")).await.unwrap();
        assert_eq!(stats, AggregateRatingStats::empty());
    }

    #[tokio::test]
    async fn test_helpful_votes_are_deduplicated_per_voter() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();

        let review = store
            .create_review(Some(&alice), input("agent-x", 5, "Great", "Works well"))
            .await
            .unwrap();
        let listed = list(&store, None, "agent-x", SortBy::Newest).await;
        assert_eq!(listed.reviews[0].helpful_votes, 0);

        let vote = store.mark_helpful(Some(&alice), review.id, true).await.unwrap();
        assert_eq!(vote.helpful_votes, 1);
        assert!(vote.is_helpful);

        let repeat = store.mark_helpful(Some(&alice), review.id, true).await.unwrap();
        assert_eq!(repeat.helpful_votes, 1);

        let bob_vote = store.mark_helpful(Some(&bob()), review.id, true).await.unwrap();
        assert_eq!(bob_vote.helpful_votes, 2);

        let seen_by_alice = list(&store, Some(&alice), "agent-x", SortBy::Newest).await;
        assert!(seen_by_alice.reviews[0].is_helpful);
        let seen_anonymously = list(&store, None, "agent-x", SortBy::Newest).await;
        assert!(!seen_anonymously.reviews[0].is_helpful);

        let withdrawn = store.mark_helpful(Some(&alice), review.id, false).await.unwrap();
        assert_eq!(withdrawn.helpful_votes, 1);
        assert!(!withdrawn.is_helpful);
        let withdrawn_again = store.mark_helpful(Some(&alice), review.id, false).await.unwrap();
        assert_eq!(withdrawn_again.helpful_votes, 1);

        let anon = store.mark_helpful(None, review.id, true).await;
        assert_eq!(code_of(anon), "UNAUTHENTICATED");
        let missing = store.mark_helpful(Some(&alice), ReviewId::new(), true).await;
        assert_eq!(code_of(missing), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_non_author_cannot_edit_or_delete() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();
        let review = store
            .create_review(Some(&alice), input("agent-x", 5, "Great", "Works well"))
            .await
            .unwrap();

        let edit_attempt = store
            .update_review(Some(&bob()), review.id, edit(1, "Hijacked", "Nope"))
            .await;
        assert_eq!(code_of(edit_attempt), "FORBIDDEN");
        let delete_attempt = store.delete_review(Some(&bob()), review.id).await;
        assert_eq!(code_of(delete_attempt), "FORBIDDEN");

        let unchanged = store
            .get_user_review(Some(&alice), &AgentId::new("agent-x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.title, "Great");
        assert_eq!(unchanged.content, "Works well");
        assert_eq!(unchanged.rating.value(), 5);
    }

    #[tokio::test]
    async fn test_author_edit_keeps_identity_fields() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();
        let review = store
            .create_review(Some(&alice), input("agent-x", 5, "Great", "Works well"))
            .await
            .unwrap();
        store.mark_helpful(Some(&bob()), review.id, true).await.unwrap();

        let mut changes = edit(3, "Decent", "Better on small tasks");
        changes.pros = vec!["Cheap".into(), " ".into()];
        let updated = store
            .update_review(Some(&alice), review.id, changes)
            .await
            .unwrap();

        assert_eq!(updated.id, review.id);
        assert_eq!(updated.agent_id, review.agent_id);
        assert_eq!(updated.author.id, review.author.id);
        assert_eq!(updated.created_at, review.created_at);
        assert!(updated.updated_at >= review.updated_at);
        assert_eq!(updated.helpful_votes, 1);
        assert_eq!(updated.rating.value(), 3);
        assert_eq!(updated.pros, vec!["Cheap"]);

        let invalid = store
            .update_review(Some(&alice), review.id, edit(3, "", "x"))
            .await;
        assert_eq!(code_of(invalid), "VALIDATION_ERROR");

        let missing = store
            .update_review(Some(&alice), ReviewId::new(), edit(3, "t", "c"))
            .await;
        assert_eq!(code_of(missing), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_moderator_can_edit_delete_and_moderate() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        let alice = alice();
        let moderator = moderator();
        let review = store
            .create_review(Some(&alice), input("agent-x", 2, "Spam", "Buy now"))
            .await
            .unwrap();

        let refused = store
            .update_review_status(Some(&alice), review.id, ReviewStatus::Rejected)
            .await;
        assert_eq!(code_of(refused), "FORBIDDEN");

        let rejected = store
            .update_review_status(Some(&moderator), review.id, ReviewStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(rejected.status, ReviewStatus::Rejected);

        // hidden from the public and from other users, but not from its author or moderators
        assert_eq!(list(&store, None, "agent-x", SortBy::Newest).await.total_count, 0);
        assert_eq!(list(&store, Some(&bob()), "agent-x", SortBy::Newest).await.total_count, 0);
        let moderated = list(&store, Some(&moderator), "agent-x", SortBy::Newest).await;
        assert_eq!(moderated.total_count, 1);
        assert_eq!(moderated.average_rating, Some(0.0));
        let own = store
            .get_user_review(Some(&alice), &AgentId::new("agent-x"))
            .await
            .unwrap();
        assert_eq!(own.map(|r| r.status), Some(ReviewStatus::Rejected));

        let hidden_vote = store.mark_helpful(Some(&bob()), review.id, true).await;
        assert_eq!(code_of(hidden_vote), "NOT_FOUND");

        store
            .update_review(Some(&moderator), review.id, edit(2, "Edited", "Cleaned up"))
            .await
            .unwrap();
        assert!(store.delete_review(Some(&moderator), review.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_moderation_queue_when_auto_publish_is_off() {
        let policy = StorePolicy { auto_publish: false };
        let store = SqliteReviewStore::in_memory_with_policy(policy).await.unwrap();
        let alice = alice();
        let moderator = moderator();

        let review = store
            .create_review(Some(&alice), input("agent-x", 4, "Nice", "Good"))
            .await
            .unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(list(&store, None, "agent-x", SortBy::Newest).await.total_count, 0);

        store
            .update_review_status(Some(&moderator), review.id, ReviewStatus::Published)
            .await
            .unwrap();
        assert_eq!(list(&store, None, "agent-x", SortBy::Newest).await.total_count, 1);

        let edited = store
            .update_review(Some(&alice), review.id, edit(5, "Nicer", "Better"))
            .await
            .unwrap();
        assert_eq!(edited.status, ReviewStatus::Pending);
        assert_eq!(list(&store, None, "agent-x", SortBy::Newest).await.total_count, 0);
    }

    #[tokio::test]
    async fn test_pagination_keeps_aggregate_over_all_reviews() {
        let store = SqliteReviewStore::in_memory().await.unwrap();
        for i in 0..5u8 {
            let user = Identity::user(format!("u-{}", i), format!("user{}", i));
            store
                .create_review(Some(&user), input("agent-x", i + 1, "Title", "Body"))
                .await
                .unwrap();
        }

        let query = ReviewQuery::new(AgentId::new("agent-x"), SortBy::HighestRating)
            .with_page(PageRequest::new(2, 1));
        let page = store.get_reviews(None, &query).await.unwrap();

        let ratings: Vec<u8> = page.reviews.iter().map(|r| r.rating.value()).collect();
        assert_eq!(ratings, vec![4, 3]);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.average_rating, Some(3.0));
    }

    #[tokio::test]
    async fn test_store_reopens_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("reviews.db").display());

        {
            let store = SqliteReviewStore::new(&url, StorePolicy::default()).await.unwrap();
            store
                .create_review(Some(&alice()), input("agent-x", 5, "Great", "Persisted"))
                .await
                .unwrap();
        }

        let reopened = SqliteReviewStore::new(&url, StorePolicy::default()).await.unwrap();
        let page = list(&reopened, None, "agent-x", SortBy::Newest).await;
        assert_eq!(page.total_count, 1);
        assert_eq!(page.reviews[0].content, "Persisted");
    }
}
