// Demo data applied at start-up when SEED_DEMO is set

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::restaurants::EmailTone;

pub const DEMO_USER_EXTERNAL_ID: &str = "demo_system_user";
pub const DEMO_PUBLIC_ID: &str = "demo";
pub const DEMO_SLUG: &str = "demo";
pub const DEMO_NAME: &str = "Restostar";
pub const DEMO_REVIEW_URL: &str = "https://maps.google.com/?cid=demo";

/// Ensure the demo owner and the `demo/demo` restaurant exist
///
/// Safe to run on every start; returns whether the restaurant was created.
pub async fn seed_demo(pool: &PgPool, now: DateTime<Utc>) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let owner_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (external_id, name, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
        RETURNING id
        "#,
    )
    .bind(DEMO_USER_EXTERNAL_ID)
    .bind(DEMO_NAME)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let created = sqlx::query(
        r#"
        INSERT INTO restaurants
            (owner_id, public_id, slug, name, review_url, email_tone, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(owner_id)
    .bind(DEMO_PUBLIC_ID)
    .bind(DEMO_SLUG)
    .bind(DEMO_NAME)
    .bind(DEMO_REVIEW_URL)
    .bind(EmailTone::Assist)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    tx.commit().await?;

    if created {
        info!("Seeded demo restaurant {}/{}", DEMO_PUBLIC_ID, DEMO_SLUG);
    } else {
        info!("Demo restaurant already present");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::test_support::{fixed_now, restaurant_service};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_seed_is_idempotent() {
        let pool = create_test_pool().await;

        seed_demo(&pool, fixed_now()).await.unwrap();
        assert!(!seed_demo(&pool, fixed_now()).await.unwrap());

        let demo = restaurant_service(&pool)
            .find_by_public_key(DEMO_PUBLIC_ID, DEMO_SLUG)
            .await
            .unwrap()
            .expect("demo restaurant");
        assert_eq!(demo.name, DEMO_NAME);
        assert_eq!(demo.review_url, DEMO_REVIEW_URL);
        assert_eq!(demo.email_tone, EmailTone::Assist);
    }
}
