use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::notifications::models::{NotificationJob, NotificationPayload};

const JOB_COLUMNS: &str = "id, customer_coupon_id, payload, run_at, attempts, status, last_error, \
     locked_until, created_at, completed_at";

/// Durable queue of coupon emails waiting to be sent
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new JobRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queue a notification on the caller's connection
    ///
    /// Runs inside the issuing transaction so a coupon never exists without
    /// its job, nor a job without its coupon.
    pub async fn enqueue(
        &self,
        conn: &mut PgConnection,
        payload: &NotificationPayload,
        run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Uuid, ApiError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO notification_jobs (customer_coupon_id, payload, run_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(payload.customer_coupon_id)
        .bind(Json(payload))
        .bind(run_at)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Lease up to `limit` due jobs
    ///
    /// Rows locked by another worker are skipped; a claimed job stays
    /// invisible until `now + lease` even if this worker dies.
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<NotificationJob>, ApiError> {
        let jobs = sqlx::query_as::<_, NotificationJob>(&format!(
            r#"
            UPDATE notification_jobs
            SET locked_until = $2
            WHERE id IN (
                SELECT id FROM notification_jobs
                WHERE status = 'pending'
                  AND run_at <= $1
                  AND (locked_until IS NULL OR locked_until <= $1)
                ORDER BY run_at
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(now + lease)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Extend a lease this worker still holds
    ///
    /// `held` is the `locked_until` seen at claim time. Returns false when
    /// the row has moved on, i.e. it was re-claimed or is no longer pending.
    pub async fn renew_lease(
        &self,
        id: Uuid,
        held: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        let renewed = sqlx::query(
            r#"
            UPDATE notification_jobs
            SET locked_until = $3
            WHERE id = $1
              AND status = 'pending'
              AND locked_until IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(id)
        .bind(held)
        .bind(until)
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;

        Ok(renewed)
    }

    pub async fn complete(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE notification_jobs
            SET status = 'completed', completed_at = $2, locked_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed attempt and put the job back in the queue
    pub async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        run_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE notification_jobs
            SET attempts = $2, last_error = $3, run_at = $4, locked_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .bind(run_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record the last failed attempt; the job is never picked up again
    pub async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE notification_jobs
            SET status = 'failed', attempts = $2, last_error = $3,
                completed_at = $4, locked_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Jobs queued for a coupon, oldest first
    pub async fn list_for_coupon(&self, customer_coupon_id: Uuid) -> Result<Vec<NotificationJob>, ApiError> {
        let jobs = sqlx::query_as::<_, NotificationJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM notification_jobs WHERE customer_coupon_id = $1 ORDER BY created_at, id"
        ))
        .bind(customer_coupon_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }
}
