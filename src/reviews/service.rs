use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::User;
use crate::coupons::{CouponRepository, CustomerCoupon, NewCoupon};
use crate::error::ApiError;
use crate::identifiers::{email_fingerprint, generate_coupon_code, normalize_email, MAX_GENERATION_ATTEMPTS};
use crate::notifications::{JobRepository, NotificationPayload};
use crate::policies::{resolve_send_delay, CouponPolicy, PolicyService, SentimentType};
use crate::restaurants::{Restaurant, RestaurantService};
use crate::reviews::models::{
    LikedCategory, ListReviewsQuery, Review, ReviewPage, ReviewPageQuery, SubmitReviewRequest,
    SubmitReviewResponse,
};
use crate::reviews::rating::{clamp_stars, distinct_categories, is_public};
use crate::reviews::repository::{NewReview, ReviewRepository};
use crate::validation::trim_to_option;
use crate::SharedClock;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;
pub const DEFAULT_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Limit for the non-paginated listing
pub fn effective_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// `(page, per_page, offset)` for a 1-based page request
pub fn page_window(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(per_page);
    (page, per_page, offset)
}

/// Opaque listing position: `<created_at micros>_<review id>`
pub fn encode_cursor(review: &Review) -> String {
    format!("{}_{}", review.created_at.timestamp_micros(), review.id)
}

pub fn decode_cursor(cursor: &str) -> Result<(DateTime<Utc>, Uuid), ApiError> {
    let invalid = || ApiError::validation("cursor", "Invalid cursor");
    let (micros, id) = cursor.split_once('_').ok_or_else(invalid)?;
    let created_at = micros
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_micros)
        .ok_or_else(invalid)?;
    let id = Uuid::parse_str(id).map_err(|_| invalid())?;
    Ok((created_at, id))
}

/// A submission after normalization, before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewIntake {
    pub stars: i16,
    pub sentiment: SentimentType,
    pub feedback_text: Option<String>,
    /// Always empty for negative reviews
    pub liked_categories: Vec<LikedCategory>,
    pub email: Option<String>,
}

/// Normalize a public submission
///
/// A blank email counts as no email; anything else must normalize or the
/// whole submission is rejected.
pub fn prepare_intake(request: &SubmitReviewRequest) -> Result<ReviewIntake, ApiError> {
    let stars = clamp_stars(request.stars)?;
    let sentiment = SentimentType::from_stars(stars);

    let email = match trim_to_option(request.email.clone()) {
        Some(raw) => Some(normalize_email(&raw).ok_or(ApiError::InvalidEmail)?),
        None => None,
    };

    let liked_categories = match (sentiment, &request.liked_categories) {
        (SentimentType::Positive, Some(categories)) => distinct_categories(categories),
        _ => Vec::new(),
    };

    Ok(ReviewIntake {
        stars,
        sentiment,
        feedback_text: trim_to_option(request.feedback_text.clone()),
        liked_categories,
        email,
    })
}

/// Snapshot of everything the coupon email needs
pub fn notification_payload(
    coupon: &CustomerCoupon,
    restaurant: &Restaurant,
    policy: Option<&CouponPolicy>,
    intake: &ReviewIntake,
) -> NotificationPayload {
    let positive = intake.sentiment == SentimentType::Positive;
    NotificationPayload {
        customer_coupon_id: coupon.id,
        recipient: coupon.email.clone(),
        restaurant_name: restaurant.name.clone(),
        coupon_code: coupon.coupon_code.clone(),
        sentiment: intake.sentiment,
        review_url: positive.then(|| restaurant.review_url.clone()),
        offer_title: policy.map(|p| p.title.clone()),
        offer_reward: policy.map(|p| p.reward.clone()),
        email_tone: restaurant.email_tone,
        liked_categories: intake.liked_categories.clone(),
        customer_feedback: if positive {
            None
        } else {
            intake.feedback_text.clone()
        },
    }
}

enum Issuance {
    Issued(CustomerCoupon),
    Existing(CustomerCoupon),
}

/// Service layer for review intake and owner review listing
#[derive(Clone)]
pub struct ReviewService {
    pool: PgPool,
    repository: ReviewRepository,
    restaurants: RestaurantService,
    policies: PolicyService,
    coupons: CouponRepository,
    jobs: JobRepository,
    clock: SharedClock,
}

impl ReviewService {
    /// Create a new ReviewService
    pub fn new(
        pool: PgPool,
        repository: ReviewRepository,
        restaurants: RestaurantService,
        policies: PolicyService,
        coupons: CouponRepository,
        jobs: JobRepository,
        clock: SharedClock,
    ) -> Self {
        Self {
            pool,
            repository,
            restaurants,
            policies,
            coupons,
            jobs,
            clock,
        }
    }

    /// Record a public review and, when an email is given, its coupon
    ///
    /// This method:
    /// 1. Normalizes the submission (rejects a malformed email before any write)
    /// 2. Resolves the restaurant from its public key
    /// 3. Computes when the coupon email goes out from the sentiment's policy
    /// 4. In one transaction: inserts the review, issues or finds the
    ///    email's coupon, and queues the notification for a new coupon
    pub async fn submit(&self, request: SubmitReviewRequest) -> Result<SubmitReviewResponse, ApiError> {
        // 1. Normalize
        let intake = prepare_intake(&request)?;
        let now = self.clock.utc();

        // 2. Resolve restaurant
        let restaurant = self
            .restaurants
            .find_by_public_key(&request.public_id, &request.slug)
            .await?
            .ok_or_else(|| {
                ApiError::not_found("Restaurant", format!("{}/{}", request.public_id, request.slug))
            })?;

        // 3. Delivery schedule
        let policy = match intake.email {
            Some(_) => {
                self.policies
                    .find_for_sentiment(restaurant.id, intake.sentiment)
                    .await?
            }
            None => None,
        };
        let scheduled_for = now + Duration::minutes(resolve_send_delay(policy.as_ref()));

        // 4. Persist
        let mut tx = self.pool.begin().await?;
        let review = self
            .repository
            .insert(
                &mut *tx,
                &NewReview {
                    restaurant_id: restaurant.id,
                    stars: intake.stars,
                    feedback_text: intake.feedback_text.clone(),
                    liked_categories: (!intake.liked_categories.is_empty()).then(|| {
                        intake
                            .liked_categories
                            .iter()
                            .map(|c| c.as_str().to_string())
                            .collect()
                    }),
                    is_public: is_public(intake.stars),
                    created_at: now,
                },
            )
            .await?;

        let Some(email) = intake.email.as_deref() else {
            tx.commit().await?;
            info!("Recorded {}-star review {} without email", review.stars, review.id);
            return Ok(SubmitReviewResponse::without_coupon(review.id));
        };

        let response = match self
            .issue_coupon(&mut *tx, &review, email, scheduled_for, now)
            .await?
        {
            Issuance::Existing(coupon) => {
                info!(
                    "Review {} from {} reuses coupon {}",
                    review.id,
                    email_fingerprint(email),
                    coupon.id
                );
                SubmitReviewResponse::already_received(review.id, coupon.coupon_code)
            }
            Issuance::Issued(coupon) => {
                let payload = notification_payload(&coupon, &restaurant, policy.as_ref(), &intake);
                self.jobs
                    .enqueue(&mut *tx, &payload, scheduled_for, now)
                    .await?;
                info!(
                    "Issued {} coupon {} for review {} to {}, email due {}",
                    intake.sentiment,
                    coupon.id,
                    review.id,
                    email_fingerprint(email),
                    scheduled_for
                );
                SubmitReviewResponse::issued(review.id, coupon.coupon_code)
            }
        };

        tx.commit().await?;
        Ok(response)
    }

    /// Find the email's coupon at this restaurant or mint a new one
    ///
    /// Both unique constraints are resolved by the insert itself; an empty
    /// `RETURNING` is followed by one lookup to tell the two apart.
    async fn issue_coupon(
        &self,
        conn: &mut PgConnection,
        review: &Review,
        email: &str,
        scheduled_for: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Issuance, ApiError> {
        if let Some(existing) = self
            .coupons
            .find_by_restaurant_email(conn, review.restaurant_id, email)
            .await?
        {
            return Ok(Issuance::Existing(existing));
        }

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = NewCoupon {
                review_id: review.id,
                restaurant_id: review.restaurant_id,
                email: email.to_string(),
                coupon_code: generate_coupon_code(),
                created_at: now,
                scheduled_for,
            };
            if let Some(coupon) = self.coupons.insert_if_absent(conn, &candidate).await? {
                return Ok(Issuance::Issued(coupon));
            }
            if let Some(existing) = self
                .coupons
                .find_by_restaurant_email(conn, review.restaurant_id, email)
                .await?
            {
                return Ok(Issuance::Existing(existing));
            }
            debug!("Coupon code collision on attempt {}", attempt);
        }

        Err(ApiError::CodeGenerationExhausted)
    }

    /// Newest reviews of an owned restaurant
    pub async fn list(
        &self,
        owner: &User,
        restaurant_id: Uuid,
        query: ListReviewsQuery,
    ) -> Result<Vec<Review>, ApiError> {
        let restaurant = self.restaurants.load_owned(owner, restaurant_id).await?;
        self.repository
            .list_recent(restaurant.id, effective_limit(query.limit))
            .await
    }

    /// One page of reviews of an owned restaurant, optionally since an instant
    ///
    /// A `cursor` continues from the previous page by key, so rows inserted
    /// meanwhile neither shift nor repeat items. Without one, `page` selects
    /// by offset.
    pub async fn list_page(
        &self,
        owner: &User,
        restaurant_id: Uuid,
        query: ReviewPageQuery,
    ) -> Result<ReviewPage, ApiError> {
        let before = query.cursor.as_deref().map(decode_cursor).transpose()?;
        let restaurant = self.restaurants.load_owned(owner, restaurant_id).await?;
        let (page, per_page, offset) = page_window(query.page, query.per_page);
        let offset = if before.is_some() { 0 } else { offset };

        let mut items = self
            .repository
            .list_page(restaurant.id, query.since, before, per_page + 1, offset)
            .await?;
        let has_more = items.len() as i64 > per_page;
        items.truncate(per_page as usize);
        let next_cursor = if has_more {
            items.last().map(encode_cursor)
        } else {
            None
        };

        Ok(ReviewPage {
            items,
            page,
            per_page,
            has_more,
            next_cursor,
        })
    }
}
