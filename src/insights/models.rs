use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

/// Most complaints or suggestions kept from a generated insight
pub const MAX_INSIGHT_ITEMS: usize = 5;

/// Window of reviews an insight covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Last 24 hours
    Daily,
    /// Last 30 days
    Monthly,
    All,
}

impl TimeRange {
    /// Earliest review creation time included, `None` for no bound
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Daily => Some(now - Duration::hours(24)),
            TimeRange::Monthly => Some(now - Duration::days(30)),
            TimeRange::All => None,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Daily => write!(f, "daily"),
            TimeRange::Monthly => write!(f, "monthly"),
            TimeRange::All => write!(f, "all"),
        }
    }
}

/// Cached feedback analysis for one restaurant and window
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub time_range: TimeRange,
    pub sentiment_summary: String,
    pub key_complaints: Vec<String>,
    pub suggestions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Validated content of a generated insight
#[derive(Debug, Clone, PartialEq)]
pub struct InsightDraft {
    pub sentiment_summary: String,
    pub key_complaints: Vec<String>,
    pub suggestions: Vec<String>,
}

impl InsightDraft {
    /// Validate a generated JSON document
    ///
    /// The summary is required. Missing or non-array lists become empty,
    /// list items are stringified and only the first five are kept.
    pub fn from_value(document: &Value) -> Result<Self, ApiError> {
        let empty = serde_json::Map::new();
        let fields = document.as_object().unwrap_or(&empty);

        let sentiment_summary = fields
            .get("sentimentSummary")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if sentiment_summary.is_empty() {
            return Err(ApiError::Upstream(
                "Generated insight is missing sentimentSummary".to_string(),
            ));
        }

        Ok(Self {
            sentiment_summary: sentiment_summary.to_string(),
            key_complaints: string_list(fields.get("keyComplaints")),
            suggestions: string_list(fields.get("suggestions")),
        })
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .take(MAX_INSIGHT_ITEMS)
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}
