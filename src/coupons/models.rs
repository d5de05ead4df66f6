use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::policies::SentimentType;

/// Domain model representing an issued customer coupon in the database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCoupon {
    pub id: Uuid,
    pub review_id: Option<Uuid>,
    pub restaurant_id: Uuid,
    pub email: String,
    pub coupon_code: String,
    pub is_redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Values of a coupon about to be inserted
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub review_id: Uuid,
    pub restaurant_id: Uuid,
    pub email: String,
    pub coupon_code: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: DateTime<Utc>,
}

/// A coupon joined with what redemption screens show about it
///
/// Restaurant, review and policy are left-joined: any of them may have
/// been deleted since issuance.
#[derive(Debug, Clone, FromRow)]
pub struct CouponDetails {
    pub id: Uuid,
    pub coupon_code: String,
    pub email: String,
    pub restaurant_id: Uuid,
    pub is_redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub restaurant_name: Option<String>,
    pub owner_id: Option<Uuid>,
    pub review_stars: Option<i16>,
    pub offer_title: Option<String>,
    pub offer_reward: Option<String>,
}

impl CouponDetails {
    /// Sentiment of the originating review, if it still exists
    pub fn sentiment_type(&self) -> Option<SentimentType> {
        self.review_stars.map(SentimentType::from_stars)
    }
}

/// Request DTO for both redemption endpoints
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub coupon_code: String,
}

/// Query for GET /api/coupons/verify
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VerifyQuery {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    Redeemed,
    AlreadyRedeemed,
}

/// Result of the staff-facing redemption
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionResult {
    pub status: RedemptionStatus,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub restaurant_name: Option<String>,
    pub sentiment_type: Option<SentimentType>,
    pub offer_title: Option<String>,
    pub offer_discount_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    NotFound,
    Invalid,
    Unauthorized,
    Valid,
    AlreadyRedeemed,
}

/// Result of an owner's coupon lookup
///
/// Coupon fields are only present for `valid` and `already_redeemed`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_type: Option<SentimentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_discount_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_redeemed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_stars: Option<i16>,
}

impl VerificationResult {
    pub fn rejected(status: VerificationStatus, message: &str) -> Self {
        Self {
            status,
            message: Some(message.to_string()),
            coupon_code: None,
            restaurant_name: None,
            customer_email: None,
            sentiment_type: None,
            offer_title: None,
            offer_discount_value: None,
            is_redeemed: None,
            redeemed_at: None,
            sent_at: None,
            review_stars: None,
        }
    }
}

/// Result of an owner-initiated redemption
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRedemption {
    pub success: bool,
    pub redeemed_at: DateTime<Utc>,
}
