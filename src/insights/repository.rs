use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::insights::models::{Insight, InsightDraft, TimeRange};

const INSIGHT_COLUMNS: &str =
    "id, restaurant_id, time_range, sentiment_summary, key_complaints, suggestions, generated_at";

/// Repository for cached insights
#[derive(Clone)]
pub struct InsightRepository {
    pool: PgPool,
}

impl InsightRepository {
    /// Create a new InsightRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the cached insight for `(restaurant_id, time_range)`
    pub async fn upsert(
        &self,
        restaurant_id: Uuid,
        time_range: TimeRange,
        draft: &InsightDraft,
        generated_at: DateTime<Utc>,
    ) -> Result<Insight, ApiError> {
        let insight = sqlx::query_as::<_, Insight>(&format!(
            r#"
            INSERT INTO insights (restaurant_id, time_range, sentiment_summary, key_complaints, suggestions, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (restaurant_id, time_range) DO UPDATE
            SET sentiment_summary = EXCLUDED.sentiment_summary,
                key_complaints = EXCLUDED.key_complaints,
                suggestions = EXCLUDED.suggestions,
                generated_at = EXCLUDED.generated_at
            RETURNING {INSIGHT_COLUMNS}
            "#
        ))
        .bind(restaurant_id)
        .bind(time_range)
        .bind(&draft.sentiment_summary)
        .bind(&draft.key_complaints)
        .bind(&draft.suggestions)
        .bind(generated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(insight)
    }

    pub async fn find(
        &self,
        restaurant_id: Uuid,
        time_range: TimeRange,
    ) -> Result<Option<Insight>, ApiError> {
        let insight = sqlx::query_as::<_, Insight>(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE restaurant_id = $1 AND time_range = $2"
        ))
        .bind(restaurant_id)
        .bind(time_range)
        .fetch_optional(&self.pool)
        .await?;

        Ok(insight)
    }
}
