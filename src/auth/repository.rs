// Database repository for owner records

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::models::{ExternalIdentity, User};
use crate::error::ApiError;

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the user for `identity`, or return the existing row
    ///
    /// Single statement keyed on the unique `external_id`, so concurrent
    /// first requests converge on one row. Stored name/email win over claims.
    pub async fn upsert(
        &self,
        identity: &ExternalIdentity,
        now: DateTime<Utc>,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, name, email, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE
            SET name = COALESCE(users.name, EXCLUDED.name),
                email = COALESCE(users.email, EXCLUDED.email)
            RETURNING id, external_id, name, email, created_at
            "#,
        )
        .bind(&identity.external_id)
        .bind(&identity.name)
        .bind(&identity.email)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by external identity id
    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, external_id, name, email, created_at FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Overwrite the profile fields of a user
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, email = $2
            WHERE id = $3
            RETURNING id, external_id, name, email, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

        Ok(user)
    }
}
