use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::coupons::models::{CouponDetails, CustomerCoupon, NewCoupon};
use crate::error::ApiError;

const COUPON_COLUMNS: &str = "id, review_id, restaurant_id, email, coupon_code, is_redeemed, \
     redeemed_at, created_at, scheduled_for, sent_at";

/// Repository for database operations on customer coupons
#[derive(Clone)]
pub struct CouponRepository {
    pool: PgPool,
}

impl CouponRepository {
    /// Create a new CouponRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The coupon already held by `email` at a restaurant, if any
    pub async fn find_by_restaurant_email(
        &self,
        conn: &mut PgConnection,
        restaurant_id: Uuid,
        email: &str,
    ) -> Result<Option<CustomerCoupon>, ApiError> {
        let coupon = sqlx::query_as::<_, CustomerCoupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM customer_coupons WHERE restaurant_id = $1 AND email = $2"
        ))
        .bind(restaurant_id)
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(coupon)
    }

    /// Insert a coupon unless it collides with an existing row
    ///
    /// `None` means either the code or the `(restaurant_id, email)` pair is
    /// taken; the caller tells them apart.
    pub async fn insert_if_absent(
        &self,
        conn: &mut PgConnection,
        coupon: &NewCoupon,
    ) -> Result<Option<CustomerCoupon>, ApiError> {
        let inserted = sqlx::query_as::<_, CustomerCoupon>(&format!(
            r#"
            INSERT INTO customer_coupons (review_id, restaurant_id, email, coupon_code, created_at, scheduled_for)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            RETURNING {COUPON_COLUMNS}
            "#
        ))
        .bind(coupon.review_id)
        .bind(coupon.restaurant_id)
        .bind(&coupon.email)
        .bind(&coupon.coupon_code)
        .bind(coupon.created_at)
        .bind(coupon.scheduled_for)
        .fetch_optional(conn)
        .await?;

        Ok(inserted)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerCoupon>, ApiError> {
        let coupon = sqlx::query_as::<_, CustomerCoupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM customer_coupons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    /// Coupon by code, joined with its restaurant, review and matching policy
    pub async fn find_details_by_code(&self, code: &str) -> Result<Option<CouponDetails>, ApiError> {
        let details = sqlx::query_as::<_, CouponDetails>(
            r#"
            SELECT c.id, c.coupon_code, c.email, c.restaurant_id, c.is_redeemed,
                   c.redeemed_at, c.sent_at,
                   r.name AS restaurant_name, r.owner_id,
                   rv.stars AS review_stars,
                   p.title AS offer_title, p.reward AS offer_reward
            FROM customer_coupons c
            LEFT JOIN restaurants r ON r.id = c.restaurant_id
            LEFT JOIN reviews rv ON rv.id = c.review_id
            LEFT JOIN coupon_policies p
              ON p.restaurant_id = c.restaurant_id
             AND p.sentiment_type = CASE WHEN rv.stars >= 4 THEN 'positive' ELSE 'negative' END
             AND rv.id IS NOT NULL
            WHERE c.coupon_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    /// Flip a coupon to redeemed in one statement
    ///
    /// Returns the new `redeemed_at`, or `None` if the coupon was already
    /// redeemed (or does not exist).
    pub async fn redeem(&self, code: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ApiError> {
        let redeemed_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            UPDATE customer_coupons
            SET is_redeemed = TRUE, redeemed_at = $2
            WHERE coupon_code = $1 AND NOT is_redeemed
            RETURNING redeemed_at
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redeemed_at.flatten())
    }

    /// Stored redemption time of a coupon
    pub async fn redeemed_at(&self, code: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        let redeemed_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT redeemed_at FROM customer_coupons WHERE coupon_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redeemed_at.flatten())
    }

    /// Stamp `sent_at` unless delivery was already recorded
    pub async fn mark_sent(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE customer_coupons SET sent_at = $2 WHERE id = $1 AND sent_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
