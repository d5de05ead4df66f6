use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::restaurants::models::{Restaurant, RestaurantFields};

const RESTAURANT_COLUMNS: &str =
    "id, owner_id, public_id, slug, name, logo_url, review_url, email_tone, created_at";

/// Repository for database operations on restaurants
#[derive(Clone)]
pub struct RestaurantRepository {
    pool: PgPool,
}

impl RestaurantRepository {
    /// Create a new RestaurantRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a restaurant
    ///
    /// Returns the raw sqlx error so callers can tell a `public_id`
    /// collision from a per-owner slug collision.
    pub async fn insert(
        &self,
        owner_id: Uuid,
        public_id: &str,
        fields: &RestaurantFields,
        now: DateTime<Utc>,
    ) -> Result<Restaurant, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(&format!(
            r#"
            INSERT INTO restaurants
                (owner_id, public_id, slug, name, logo_url, review_url, email_tone, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RESTAURANT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(public_id)
        .bind(&fields.slug)
        .bind(&fields.name)
        .bind(&fields.logo_url)
        .bind(&fields.review_url)
        .bind(fields.email_tone)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Overwrite every editable column of a restaurant
    pub async fn update(&self, id: Uuid, fields: &RestaurantFields) -> Result<Restaurant, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(&format!(
            r#"
            UPDATE restaurants
            SET slug = $1, name = $2, logo_url = $3, review_url = $4, email_tone = $5
            WHERE id = $6
            RETURNING {RESTAURANT_COLUMNS}
            "#
        ))
        .bind(&fields.slug)
        .bind(&fields.name)
        .bind(&fields.logo_url)
        .bind(&fields.review_url)
        .bind(fields.email_tone)
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a restaurant by internal id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, ApiError> {
        let restaurant = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(restaurant)
    }

    /// Find a restaurant by its public (publicId, slug) key
    pub async fn find_by_public_key(
        &self,
        public_id: &str,
        slug: &str,
    ) -> Result<Option<Restaurant>, ApiError> {
        let restaurant = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE public_id = $1 AND slug = $2"
        ))
        .bind(public_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(restaurant)
    }

    /// All restaurants of an owner, oldest first
    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Restaurant>, ApiError> {
        let restaurants = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE owner_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }
}
