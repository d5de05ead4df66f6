use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::policies::models::{CouponPolicy, PolicyFields, SentimentType};

const POLICY_COLUMNS: &str = "id, restaurant_id, sentiment_type, title, description, reward, \
     is_single_use, send_delay_minutes, created_at";

/// Repository for database operations on coupon policies
#[derive(Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    /// Create a new PolicyRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace in place the policy for (restaurant, sentiment)
    ///
    /// An existing row keeps its id and creation time.
    pub async fn upsert(
        &self,
        restaurant_id: Uuid,
        sentiment: SentimentType,
        fields: &PolicyFields,
        now: DateTime<Utc>,
    ) -> Result<CouponPolicy, ApiError> {
        let policy = sqlx::query_as::<_, CouponPolicy>(&format!(
            r#"
            INSERT INTO coupon_policies
                (restaurant_id, sentiment_type, title, description, reward,
                 is_single_use, send_delay_minutes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (restaurant_id, sentiment_type) DO UPDATE
            SET title = EXCLUDED.title,
                description = EXCLUDED.description,
                reward = EXCLUDED.reward,
                is_single_use = EXCLUDED.is_single_use,
                send_delay_minutes = EXCLUDED.send_delay_minutes
            RETURNING {POLICY_COLUMNS}
            "#
        ))
        .bind(restaurant_id)
        .bind(sentiment)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.reward)
        .bind(fields.is_single_use)
        .bind(fields.send_delay.minutes())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(policy)
    }

    /// All policies of a restaurant (zero, one or two rows)
    pub async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<CouponPolicy>, ApiError> {
        let policies = sqlx::query_as::<_, CouponPolicy>(&format!(
            "SELECT {POLICY_COLUMNS} FROM coupon_policies WHERE restaurant_id = $1 ORDER BY sentiment_type DESC"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(policies)
    }

    /// The policy for one sentiment, if configured
    pub async fn find_for_sentiment(
        &self,
        restaurant_id: Uuid,
        sentiment: SentimentType,
    ) -> Result<Option<CouponPolicy>, ApiError> {
        let policy = sqlx::query_as::<_, CouponPolicy>(&format!(
            "SELECT {POLICY_COLUMNS} FROM coupon_policies WHERE restaurant_id = $1 AND sentiment_type = $2"
        ))
        .bind(restaurant_id)
        .bind(sentiment)
        .fetch_optional(&self.pool)
        .await?;

        Ok(policy)
    }
}
