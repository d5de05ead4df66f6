use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::reviews::models::Review;

const REVIEW_COLUMNS: &str =
    "id, restaurant_id, stars, feedback_text, liked_categories, is_public, created_at";

/// Values of a review about to be inserted
#[derive(Debug, Clone)]
pub struct NewReview {
    pub restaurant_id: Uuid,
    pub stars: i16,
    pub feedback_text: Option<String>,
    pub liked_categories: Option<Vec<String>>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository for database operations on reviews
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new ReviewRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review on the caller's connection (usually a transaction)
    pub async fn insert(&self, conn: &mut PgConnection, review: &NewReview) -> Result<Review, ApiError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (restaurant_id, stars, feedback_text, liked_categories, is_public, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.restaurant_id)
        .bind(review.stars)
        .bind(&review.feedback_text)
        .bind(&review.liked_categories)
        .bind(review.is_public)
        .bind(review.created_at)
        .fetch_one(conn)
        .await?;

        Ok(review)
    }

    /// Newest reviews of a restaurant
    pub async fn list_recent(&self, restaurant_id: Uuid, limit: i64) -> Result<Vec<Review>, ApiError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS}
            FROM reviews
            WHERE restaurant_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(restaurant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// Page of reviews, newest first, optionally created at or after `since`
    ///
    /// With `before` set, rows are sought strictly after that
    /// `(created_at, id)` key in listing order and `offset` should be 0.
    pub async fn list_page(
        &self,
        restaurant_id: Uuid,
        since: Option<DateTime<Utc>>,
        before: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, ApiError> {
        let (before_at, before_id) = before.unzip();
        let reviews = sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS}
            FROM reviews
            WHERE restaurant_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR (created_at, id) < ($3, $4::uuid))
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(restaurant_id)
        .bind(since)
        .bind(before_at)
        .bind(before_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}
