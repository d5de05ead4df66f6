// Database-backed tests for review intake and coupon issuance
// Run with TEST_DATABASE_URL set: cargo test -- --ignored

use chrono::Duration;
use sqlx::PgPool;

use super::*;
use crate::coupons::CouponRepository;
use crate::db::create_test_pool;
use crate::error::ApiError;
use crate::notifications::JobRepository;
use crate::policies::{SendDelay, SentimentType, SetPolicyRequest};
use crate::restaurants::Restaurant;
use crate::test_support::{
    create_owner, create_restaurant, fixed_now, policy_service, review_service,
};

fn submission(restaurant: &Restaurant, stars: f64, email: Option<&str>) -> SubmitReviewRequest {
    SubmitReviewRequest {
        public_id: restaurant.public_id.clone(),
        slug: restaurant.slug.clone(),
        stars,
        feedback_text: Some("The soup was cold".to_string()),
        liked_categories: Some(vec![LikedCategory::Food, LikedCategory::Service]),
        email: email.map(str::to_string),
    }
}

async fn review_count(pool: &PgPool, restaurant: &Restaurant) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE restaurant_id = $1")
        .bind(restaurant.id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn coupon_for(pool: &PgPool, restaurant: &Restaurant, email: &str) -> crate::coupons::CustomerCoupon {
    let mut conn = pool.acquire().await.unwrap();
    CouponRepository::new(pool.clone())
        .find_by_restaurant_email(&mut *conn, restaurant.id, email)
        .await
        .unwrap()
        .expect("coupon exists")
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_positive_review_issues_coupon_and_queues_email() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    let service = review_service(&pool);

    let response = service
        .submit(submission(&restaurant, 5.0, Some(" Guest@Example.com ")))
        .await
        .unwrap();

    let code = response.coupon_code.clone().expect("coupon issued");
    assert_eq!(code.len(), 8);
    assert!(!response.already_received_coupon);
    assert_eq!(response.existing_coupon_code, None);

    let coupon = coupon_for(&pool, &restaurant, "guest@example.com").await;
    assert_eq!(coupon.coupon_code, code);
    assert_eq!(coupon.review_id, Some(response.review_id));
    assert_eq!(coupon.scheduled_for, Some(fixed_now() + Duration::minutes(1)));

    let jobs = JobRepository::new(pool.clone())
        .list_for_coupon(coupon.id)
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].run_at, fixed_now() + Duration::minutes(1));
    let payload = &jobs[0].payload.0;
    assert_eq!(payload.sentiment, SentimentType::Positive);
    assert_eq!(payload.review_url.as_deref(), Some(restaurant.review_url.as_str()));
    assert_eq!(payload.liked_categories, vec![LikedCategory::Food, LikedCategory::Service]);
    assert_eq!(payload.customer_feedback, None);

    let reviews = service.list(&owner, restaurant.id, ListReviewsQuery::default()).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert!(reviews[0].is_public);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_negative_review_follows_policy_delay() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    policy_service(&pool)
        .set_policy(
            &owner,
            restaurant.id,
            SentimentType::Negative,
            SetPolicyRequest {
                title: "We are sorry".to_string(),
                description: None,
                reward: "Free dessert".to_string(),
                is_single_use: true,
                send_delay_minutes: SendDelay::Immediate,
            },
        )
        .await
        .unwrap();

    review_service(&pool)
        .submit(submission(&restaurant, 2.0, Some("sad@example.com")))
        .await
        .unwrap();

    let coupon = coupon_for(&pool, &restaurant, "sad@example.com").await;
    let jobs = JobRepository::new(pool.clone())
        .list_for_coupon(coupon.id)
        .await
        .unwrap();
    assert_eq!(jobs[0].run_at, fixed_now());
    let payload = &jobs[0].payload.0;
    assert_eq!(payload.review_url, None);
    assert!(payload.liked_categories.is_empty());
    assert_eq!(payload.customer_feedback.as_deref(), Some("The soup was cold"));
    assert_eq!(payload.offer_reward.as_deref(), Some("Free dessert"));

    let reviews = review_service(&pool)
        .list(&owner, restaurant.id, ListReviewsQuery::default())
        .await
        .unwrap();
    assert!(!reviews[0].is_public);
    assert_eq!(reviews[0].liked_categories, None);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_repeat_email_gets_existing_coupon() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    let service = review_service(&pool);

    let first = service
        .submit(submission(&restaurant, 5.0, Some("regular@example.com")))
        .await
        .unwrap();
    let second = service
        .submit(submission(&restaurant, 1.0, Some("REGULAR@example.com")))
        .await
        .unwrap();

    assert!(second.already_received_coupon);
    assert_eq!(second.coupon_code, None);
    assert_eq!(second.existing_coupon_code, first.coupon_code);
    assert_ne!(second.review_id, first.review_id);
    assert_eq!(review_count(&pool, &restaurant).await, 2);

    let coupon = coupon_for(&pool, &restaurant, "regular@example.com").await;
    let jobs = JobRepository::new(pool.clone())
        .list_for_coupon(coupon.id)
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_concurrent_submissions_share_one_coupon() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    let service = review_service(&pool);

    let handles = (0..6).map(|_| {
        let service = service.clone();
        let request = submission(&restaurant, 4.0, Some("twice@example.com"));
        tokio::spawn(async move { service.submit(request).await })
    });

    let mut issued = 0;
    let mut codes = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        if response.coupon_code.is_some() {
            issued += 1;
        }
        codes.extend(response.coupon_code.or(response.existing_coupon_code));
    }

    assert_eq!(issued, 1);
    assert_eq!(codes.len(), 6);
    assert!(codes.iter().all(|code| code == &codes[0]));
    assert_eq!(review_count(&pool, &restaurant).await, 6);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_invalid_email_writes_nothing() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;

    let result = review_service(&pool)
        .submit(submission(&restaurant, 5.0, Some("not-an-email")))
        .await;

    assert!(matches!(result, Err(ApiError::InvalidEmail)));
    assert_eq!(review_count(&pool, &restaurant).await, 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_review_without_email_or_unknown_restaurant() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    let service = review_service(&pool);

    let response = service.submit(submission(&restaurant, 3.0, None)).await.unwrap();
    assert_eq!(response, SubmitReviewResponse::without_coupon(response.review_id));

    let mut unknown = submission(&restaurant, 3.0, None);
    unknown.slug = "no-such-place".to_string();
    assert!(matches!(service.submit(unknown).await, Err(ApiError::NotFound { .. })));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_listing_is_paginated_and_owner_scoped() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let stranger = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    let service = review_service(&pool);
    for stars in [1.0, 3.0, 5.0] {
        service.submit(submission(&restaurant, stars, None)).await.unwrap();
    }

    let limited = service
        .list(&owner, restaurant.id, ListReviewsQuery { limit: Some(2) })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let first = service
        .list_page(
            &owner,
            restaurant.id,
            ReviewPageQuery { per_page: Some(2), ..ReviewPageQuery::default() },
        )
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert!(first.has_more);

    let second = service
        .list_page(
            &owner,
            restaurant.id,
            ReviewPageQuery { page: Some(2), per_page: Some(2), ..ReviewPageQuery::default() },
        )
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(!second.has_more);
    assert_eq!(second.next_cursor, None);

    // Keyset continuation sees the same rows as the offset page, even
    // though all three share one created_at
    let after_first = service
        .list_page(
            &owner,
            restaurant.id,
            ReviewPageQuery {
                per_page: Some(2),
                cursor: first.next_cursor.clone(),
                ..ReviewPageQuery::default()
            },
        )
        .await
        .unwrap();
    let ids = |page: &ReviewPage| page.items.iter().map(|review| review.id).collect::<Vec<_>>();
    assert_eq!(ids(&after_first), ids(&second));
    assert!(!after_first.has_more);

    // A review arriving between page requests does not shift the next page
    service.submit(submission(&restaurant, 4.0, None)).await.unwrap();
    let still_after_first = service
        .list_page(
            &owner,
            restaurant.id,
            ReviewPageQuery {
                per_page: Some(2),
                cursor: first.next_cursor.clone(),
                ..ReviewPageQuery::default()
            },
        )
        .await
        .unwrap();
    let seen: Vec<_> = first.items.iter().map(|review| review.id).collect();
    assert!(still_after_first.items.iter().all(|review| !seen.contains(&review.id)));

    assert!(matches!(
        service
            .list_page(
                &owner,
                restaurant.id,
                ReviewPageQuery {
                    cursor: Some("garbage".to_string()),
                    ..ReviewPageQuery::default()
                },
            )
            .await,
        Err(ApiError::Validation { .. })
    ));

    let later = service
        .list_page(
            &owner,
            restaurant.id,
            ReviewPageQuery {
                since: Some(fixed_now() + Duration::seconds(1)),
                ..ReviewPageQuery::default()
            },
        )
        .await
        .unwrap();
    assert!(later.items.is_empty());

    assert!(matches!(
        service.list(&stranger, restaurant.id, ListReviewsQuery::default()).await,
        Err(ApiError::Forbidden(_))
    ));
}
