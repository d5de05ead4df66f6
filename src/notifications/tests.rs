// Database-backed tests for the notification queue and worker

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use mockable::Clock;
use uuid::Uuid;

use super::*;
use crate::ai::StubTextGenerator;
use crate::config::NotifyConfig;
use crate::coupons::{CouponRepository, CustomerCoupon};
use crate::db::create_test_pool;
use crate::policies::SentimentType;
use crate::restaurants::{EmailTone, Restaurant};
use crate::test_support::{
    create_owner, create_restaurant, fixed_clock, fixed_now, issue_coupon, SteppedClock,
};
use crate::SharedClock;

fn payload(restaurant: &Restaurant, coupon: &CustomerCoupon) -> NotificationPayload {
    NotificationPayload {
        customer_coupon_id: coupon.id,
        recipient: coupon.email.clone(),
        restaurant_name: restaurant.name.clone(),
        coupon_code: coupon.coupon_code.clone(),
        sentiment: SentimentType::Positive,
        review_url: Some(restaurant.review_url.clone()),
        offer_title: Some("Thanks".to_string()),
        offer_reward: Some("10% off".to_string()),
        email_tone: EmailTone::Manual,
        liked_categories: Vec::new(),
        customer_feedback: None,
    }
}

fn worker(pool: &sqlx::PgPool, mailer: Arc<RecordingMailer>) -> NotificationWorker {
    worker_with(pool, mailer, fixed_clock())
}

fn worker_with(pool: &sqlx::PgPool, mailer: Arc<dyn Mailer>, clock: SharedClock) -> NotificationWorker {
    NotificationWorker::new(
        JobRepository::new(pool.clone()),
        CouponRepository::new(pool.clone()),
        mailer,
        Arc::new(StubTextGenerator {
            text: None,
            json: None,
        }),
        clock,
        NotifyConfig {
            max_attempts: 2,
            ..NotifyConfig::default()
        },
    )
}

async fn queued_job(pool: &sqlx::PgPool, email: &str) -> (CustomerCoupon, NotificationJob) {
    let owner = create_owner(pool).await;
    let restaurant = create_restaurant(pool, &owner).await;
    queued_job_at(pool, &restaurant, email).await
}

async fn queued_job_at(
    pool: &sqlx::PgPool,
    restaurant: &Restaurant,
    email: &str,
) -> (CustomerCoupon, NotificationJob) {
    let coupon = issue_coupon(pool, restaurant, 5, email).await;
    let jobs = JobRepository::new(pool.clone());

    let mut conn = pool.acquire().await.unwrap();
    jobs.enqueue(&mut *conn, &payload(restaurant, &coupon), fixed_now(), fixed_now())
        .await
        .unwrap();
    let job = jobs.list_for_coupon(coupon.id).await.unwrap().remove(0);
    (coupon, job)
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_successful_send_stamps_sent_at() {
    let pool = create_test_pool().await;
    let (coupon, job) = queued_job(&pool, "happy@example.com").await;
    let mailer = Arc::new(RecordingMailer::default());
    let worker = worker(&pool, mailer.clone());

    let outcome = worker.process(job).await.unwrap();
    assert_eq!(outcome, JobOutcome::Sent);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "happy@example.com");
    assert!(sent[0].text.contains(&coupon.coupon_code));

    let stored = CouponRepository::new(pool.clone()).find_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.sent_at, Some(fixed_now()));
    let jobs = JobRepository::new(pool.clone()).list_for_coupon(coupon.id).await.unwrap();
    assert_eq!(jobs[0].status, JobStatus::Completed);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_replayed_job_does_not_send_twice() {
    let pool = create_test_pool().await;
    let (coupon, job) = queued_job(&pool, "twice@example.com").await;
    let mailer = Arc::new(RecordingMailer::default());
    let worker = worker(&pool, mailer.clone());

    assert_eq!(worker.process(job.clone()).await.unwrap(), JobOutcome::Sent);
    assert_eq!(worker.process(job).await.unwrap(), JobOutcome::AlreadySent);
    assert_eq!(mailer.sent().len(), 1);

    let stored = CouponRepository::new(pool.clone()).find_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.sent_at, Some(fixed_now()));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_failures_retry_then_give_up_without_touching_coupon() {
    let pool = create_test_pool().await;
    let (coupon, job) = queued_job(&pool, "unlucky@example.com").await;
    let worker = worker(&pool, Arc::new(RecordingMailer::failing()));
    let jobs = JobRepository::new(pool.clone());

    assert_eq!(worker.process(job).await.unwrap(), JobOutcome::Retried);
    let retried = jobs.list_for_coupon(coupon.id).await.unwrap().remove(0);
    assert_eq!(retried.status, JobStatus::Pending);
    assert_eq!(retried.attempts, 1);
    assert_eq!(retried.run_at, fixed_now() + Duration::minutes(1));
    assert!(retried.last_error.is_some());

    assert_eq!(worker.process(retried).await.unwrap(), JobOutcome::Failed);
    let failed = jobs.list_for_coupon(coupon.id).await.unwrap().remove(0);
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.attempts, 2);

    let stored = CouponRepository::new(pool.clone()).find_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.sent_at, None);
    assert!(!stored.is_redeemed);
}

/// Records the lease of the job being delivered, then stalls past it
struct SlowMailer {
    clock: Arc<SteppedClock>,
    jobs: JobRepository,
    coupons: Vec<(String, Uuid)>,
    /// `(time of send, locked_until at that moment)`
    observed: Mutex<Vec<(DateTime<Utc>, Option<DateTime<Utc>>)>>,
}

#[async_trait]
impl Mailer for SlowMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let coupon_id = self
            .coupons
            .iter()
            .find(|(email, _)| *email == message.to)
            .map(|(_, id)| *id)
            .unwrap();
        let job = self.jobs.list_for_coupon(coupon_id).await.unwrap().remove(0);
        self.observed.lock().unwrap().push((self.clock.utc(), job.locked_until));
        self.clock.advance(Duration::minutes(6));
        Ok(())
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_in_flight_job_stays_leased_across_a_slow_batch() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    let (first_coupon, first) = queued_job_at(&pool, &restaurant, "slow-1@example.com").await;
    let (second_coupon, second) = queued_job_at(&pool, &restaurant, "slow-2@example.com").await;

    let clock = Arc::new(SteppedClock::new(fixed_now()));
    let mailer = Arc::new(SlowMailer {
        clock: clock.clone(),
        jobs: JobRepository::new(pool.clone()),
        coupons: vec![
            (first_coupon.email.clone(), first_coupon.id),
            (second_coupon.email.clone(), second_coupon.id),
        ],
        observed: Mutex::new(Vec::new()),
    });
    let worker = worker_with(&pool, mailer.clone(), clock.clone());

    // Each send outlasts a lease taken when the batch started
    assert_eq!(worker.process(first).await.unwrap(), JobOutcome::Sent);
    assert_eq!(worker.process(second).await.unwrap(), JobOutcome::Sent);

    // claim_due skips rows with `locked_until > now`, so neither job was
    // claimable by another worker while its email was going out
    let observed = mailer.observed.lock().unwrap().clone();
    assert_eq!(observed.len(), 2);
    for (sent_at, locked_until) in observed {
        assert!(locked_until.is_some_and(|until| until > sent_at));
    }

    // Delivery is stamped when the send finished, not when the batch began
    let coupons = CouponRepository::new(pool.clone());
    let stored = coupons.find_by_id(second_coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.sent_at, Some(fixed_now() + Duration::minutes(12)));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_job_taken_over_by_another_worker_is_not_sent() {
    let pool = create_test_pool().await;
    let (coupon, job) = queued_job(&pool, "takeover@example.com").await;
    let mailer = Arc::new(RecordingMailer::default());
    let worker = worker(&pool, mailer.clone());
    let jobs = JobRepository::new(pool.clone());

    // Another worker re-claims the job after our stale lease
    assert!(jobs
        .renew_lease(job.id, job.locked_until, fixed_now() + Duration::minutes(5))
        .await
        .unwrap());

    assert_eq!(worker.process(job.clone()).await.unwrap(), JobOutcome::LeaseLost);
    assert!(mailer.sent().is_empty());

    let stored = CouponRepository::new(pool.clone()).find_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.sent_at, None);
    jobs.complete(job.id, fixed_now()).await.unwrap();
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_claim_respects_run_at_and_lease() {
    let pool = create_test_pool().await;
    let owner = create_owner(&pool).await;
    let restaurant = create_restaurant(&pool, &owner).await;
    let coupon = issue_coupon(&pool, &restaurant, 5, "lease@example.com").await;
    let jobs = JobRepository::new(pool.clone());

    // Far from the shared fixed clock so jobs of other tests are never due here
    let base: DateTime<Utc> = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
    let mut conn = pool.acquire().await.unwrap();
    jobs.enqueue(&mut *conn, &payload(&restaurant, &coupon), base + Duration::minutes(2), base)
        .await
        .unwrap();
    drop(conn);

    let early = jobs.claim_due(base, 10, Duration::minutes(5)).await.unwrap();
    assert!(early.iter().all(|job| job.customer_coupon_id != coupon.id));

    let due = base + Duration::minutes(2);
    let claimed = jobs.claim_due(due, 10, Duration::minutes(5)).await.unwrap();
    assert!(claimed.iter().any(|job| job.customer_coupon_id == coupon.id));

    let leased = jobs.claim_due(due + Duration::minutes(1), 10, Duration::minutes(5)).await.unwrap();
    assert!(leased.iter().all(|job| job.customer_coupon_id != coupon.id));

    let expired = jobs.claim_due(due + Duration::minutes(6), 10, Duration::minutes(5)).await.unwrap();
    let ours = expired.iter().find(|job| job.customer_coupon_id == coupon.id).unwrap();

    // Leave no pending job behind for later runs
    jobs.complete(ours.id, due).await.unwrap();
}
