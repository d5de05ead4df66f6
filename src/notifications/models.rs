use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::policies::SentimentType;
use crate::restaurants::EmailTone;
use crate::reviews::LikedCategory;

/// Everything the worker needs to write and send one coupon email
///
/// Captured when the coupon is issued, so later edits to the restaurant or
/// its policies do not change an email already queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub customer_coupon_id: Uuid,
    pub recipient: String,
    pub restaurant_name: String,
    pub coupon_code: String,
    pub sentiment: SentimentType,
    /// Public review link, positive emails only
    pub review_url: Option<String>,
    pub offer_title: Option<String>,
    pub offer_reward: Option<String>,
    pub email_tone: EmailTone,
    /// Positive emails only
    #[serde(default)]
    pub liked_categories: Vec<LikedCategory>,
    /// Negative emails only
    pub customer_feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

/// Row of the durable notification queue
#[derive(Debug, Clone, FromRow)]
pub struct NotificationJob {
    pub id: Uuid,
    pub customer_coupon_id: Uuid,
    pub payload: Json<NotificationPayload>,
    pub run_at: DateTime<Utc>,
    pub attempts: i32,
    pub status: JobStatus,
    pub last_error: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A rendered plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}
