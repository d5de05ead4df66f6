use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Aspects a happy customer can say they liked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub enum LikedCategory {
    Food,
    Ambience,
    Service,
    Value,
}

impl LikedCategory {
    /// Every category, in display order
    pub const ALL: [LikedCategory; 4] = [
        LikedCategory::Food,
        LikedCategory::Ambience,
        LikedCategory::Service,
        LikedCategory::Value,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LikedCategory::Food => "food",
            LikedCategory::Ambience => "ambience",
            LikedCategory::Service => "service",
            LikedCategory::Value => "value",
        }
    }
}

impl fmt::Display for LikedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LikedCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "food" => Ok(LikedCategory::Food),
            "ambience" => Ok(LikedCategory::Ambience),
            "service" => Ok(LikedCategory::Service),
            "value" => Ok(LikedCategory::Value),
            _ => Err(format!("Unknown category: {}", value)),
        }
    }
}

impl From<LikedCategory> for String {
    fn from(category: LikedCategory) -> Self {
        category.as_str().to_string()
    }
}

/// Domain model representing a review in the database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub stars: i16,
    pub feedback_text: Option<String>,
    pub liked_categories: Option<Vec<String>>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Public review submission from the QR-code funnel
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub public_id: String,
    pub slug: String,
    /// Any number; floored then clamped to 1..=5
    pub stars: f64,
    #[validate(length(max = 2000, message = "Feedback must not exceed 2000 characters"))]
    pub feedback_text: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub liked_categories: Option<Vec<LikedCategory>>,
    pub email: Option<String>,
}

/// Outcome of a review submission
///
/// `coupon_code` is set when a coupon was minted by this submission,
/// `existing_coupon_code` when the email already held one. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewResponse {
    pub review_id: Uuid,
    pub coupon_code: Option<String>,
    pub already_received_coupon: bool,
    pub existing_coupon_code: Option<String>,
}

impl SubmitReviewResponse {
    pub fn without_coupon(review_id: Uuid) -> Self {
        Self {
            review_id,
            coupon_code: None,
            already_received_coupon: false,
            existing_coupon_code: None,
        }
    }

    pub fn issued(review_id: Uuid, code: String) -> Self {
        Self {
            review_id,
            coupon_code: Some(code),
            already_received_coupon: false,
            existing_coupon_code: None,
        }
    }

    pub fn already_received(review_id: Uuid, existing_code: String) -> Self {
        Self {
            review_id,
            coupon_code: None,
            already_received_coupon: true,
            existing_coupon_code: Some(existing_code),
        }
    }
}

/// Query for GET /api/restaurants/{id}/reviews
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListReviewsQuery {
    /// Defaults to 50, clamped to 1..=200
    pub limit: Option<i64>,
}

/// Query for GET /api/restaurants/{id}/reviews/page
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReviewPageQuery {
    /// Only reviews created at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// 1-based page number; ignored when `cursor` is given
    pub page: Option<i64>,
    /// Defaults to 25, at most 100
    pub per_page: Option<i64>,
    /// `nextCursor` of the previous page
    pub cursor: Option<String>,
}

/// One page of reviews, newest first
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub items: Vec<Review>,
    pub page: i64,
    pub per_page: i64,
    pub has_more: bool,
    /// Pass back as `cursor` to fetch the following page
    pub next_cursor: Option<String>,
}
