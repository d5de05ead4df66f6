// Coupon policy types shared by intake, redemption and notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Coarse classification of a review
///
/// Four and five stars are positive, everything else negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SentimentType {
    Positive,
    Negative,
}

impl SentimentType {
    /// Sentiment of a clamped star rating
    pub fn from_stars(stars: i16) -> Self {
        if stars >= 4 {
            SentimentType::Positive
        } else {
            SentimentType::Negative
        }
    }
}

impl fmt::Display for SentimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentType::Positive => write!(f, "positive"),
            SentimentType::Negative => write!(f, "negative"),
        }
    }
}

impl std::str::FromStr for SentimentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(SentimentType::Positive),
            "negative" => Ok(SentimentType::Negative),
            _ => Err(format!("Invalid sentiment type: {}", s)),
        }
    }
}

/// Allowed coupon send delays, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum SendDelay {
    Immediate,
    OneMinute,
    TwoMinutes,
    FiveMinutes,
}

impl SendDelay {
    pub fn minutes(self) -> i32 {
        match self {
            SendDelay::Immediate => 0,
            SendDelay::OneMinute => 1,
            SendDelay::TwoMinutes => 2,
            SendDelay::FiveMinutes => 5,
        }
    }
}

impl TryFrom<i32> for SendDelay {
    type Error = String;

    fn try_from(minutes: i32) -> Result<Self, Self::Error> {
        match minutes {
            0 => Ok(SendDelay::Immediate),
            1 => Ok(SendDelay::OneMinute),
            2 => Ok(SendDelay::TwoMinutes),
            5 => Ok(SendDelay::FiveMinutes),
            other => Err(format!("Send delay must be one of 0, 1, 2 or 5 minutes, got {}", other)),
        }
    }
}

impl From<SendDelay> for i32 {
    fn from(delay: SendDelay) -> Self {
        delay.minutes()
    }
}

/// Domain model representing a coupon policy in the database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponPolicy {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub sentiment_type: SentimentType,
    pub title: String,
    pub description: Option<String>,
    pub reward: String,
    pub is_single_use: bool,
    /// `None` on rows written before delays were configurable
    pub send_delay_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for PUT /api/restaurants/{id}/coupon-policies/{sentiment}
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPolicyRequest {
    #[validate(
        length(max = 255, message = "Title must not exceed 255 characters"),
        custom = "crate::validation::validate_not_blank"
    )]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    pub description: Option<String>,
    #[validate(
        length(max = 255, message = "Reward must not exceed 255 characters"),
        custom = "crate::validation::validate_not_blank"
    )]
    pub reward: String,
    #[serde(default = "default_single_use")]
    pub is_single_use: bool,
    #[schema(value_type = i32, example = 1)]
    pub send_delay_minutes: SendDelay,
}

fn default_single_use() -> bool {
    true
}

/// Response DTO for a policy upsert
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPolicyResponse {
    pub policy_id: Uuid,
}

/// Trimmed, validated policy values, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyFields {
    pub title: String,
    pub description: Option<String>,
    pub reward: String,
    pub is_single_use: bool,
    pub send_delay: SendDelay,
}
