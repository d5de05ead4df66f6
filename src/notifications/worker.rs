// Background worker draining the notification queue

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, warn};

use crate::ai::TextGenerator;
use crate::config::NotifyConfig;
use crate::coupons::CouponRepository;
use crate::error::ApiError;
use crate::identifiers::email_fingerprint;
use crate::notifications::mailer::Mailer;
use crate::notifications::models::{NotificationJob, NotificationPayload};
use crate::notifications::repository::JobRepository;
use crate::notifications::templates::{compose_message, generic_intro, personalization_prompt};
use crate::restaurants::EmailTone;
use crate::SharedClock;

/// How long a claimed job stays invisible to other workers
///
/// Renewed when each job starts, so it only has to cover one job's
/// generation and mail timeouts, never a whole batch.
const JOB_LEASE_MINUTES: i64 = 5;

/// What happened to one claimed job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Sent,
    /// Delivery was already recorded; nothing sent
    AlreadySent,
    /// The coupon no longer exists
    Skipped,
    /// Another worker claimed the job after our lease ran out
    LeaseLost,
    Retried,
    Failed,
}

fn lease() -> Duration {
    Duration::minutes(JOB_LEASE_MINUTES)
}

/// Delay before retrying after `attempts` failed sends
pub fn retry_delay(attempts: i32) -> Duration {
    Duration::minutes(i64::from(attempts.max(1)))
}

pub struct NotificationWorker {
    jobs: JobRepository,
    coupons: CouponRepository,
    mailer: Arc<dyn Mailer>,
    generator: Arc<dyn TextGenerator>,
    clock: SharedClock,
    config: NotifyConfig,
}

impl NotificationWorker {
    pub fn new(
        jobs: JobRepository,
        coupons: CouponRepository,
        mailer: Arc<dyn Mailer>,
        generator: Arc<dyn TextGenerator>,
        clock: SharedClock,
        config: NotifyConfig,
    ) -> Self {
        Self {
            jobs,
            coupons,
            mailer,
            generator,
            clock,
            config,
        }
    }

    /// Poll forever; errors are logged and the next tick tries again
    pub async fn run(self) {
        info!(
            "Notification worker started (poll every {:?}, batch {})",
            self.config.poll_interval, self.config.batch_size
        );
        let mut interval = tokio::time::interval(self.config.poll_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                error!("Notification poll failed: {}", e);
            }
        }
    }

    /// Claim and process one batch of due jobs
    ///
    /// A job that errors is logged and left leased; it becomes claimable
    /// again once the lease expires. The rest of the batch still runs.
    pub async fn run_once(&self) -> Result<Vec<JobOutcome>, ApiError> {
        let jobs = self
            .jobs
            .claim_due(self.clock.utc(), self.config.batch_size, lease())
            .await?;
        if !jobs.is_empty() {
            debug!("Claimed {} notification jobs", jobs.len());
        }

        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let id = job.id;
            match self.process(job).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Notification job {} aborted: {}", id, e),
            }
        }
        Ok(outcomes)
    }

    /// Send one claimed job, idempotent on the coupon's `sent_at`
    ///
    /// The lease is renewed against the clock before sending; if another
    /// worker has taken the job since it was claimed, nothing is sent.
    pub async fn process(&self, job: NotificationJob) -> Result<JobOutcome, ApiError> {
        let now = self.clock.utc();
        let Some(coupon) = self.coupons.find_by_id(job.customer_coupon_id).await? else {
            warn!("Dropping notification job {}: coupon is gone", job.id);
            self.jobs.complete(job.id, now).await?;
            return Ok(JobOutcome::Skipped);
        };
        if coupon.sent_at.is_some() {
            debug!("Coupon {} already delivered, completing job {}", coupon.id, job.id);
            self.jobs.complete(job.id, now).await?;
            return Ok(JobOutcome::AlreadySent);
        }
        if !self.jobs.renew_lease(job.id, job.locked_until, now + lease()).await? {
            warn!("Notification job {} was claimed by another worker", job.id);
            return Ok(JobOutcome::LeaseLost);
        }

        let payload = &job.payload.0;
        let intro = self.write_intro(payload).await;
        let message = compose_message(payload, &intro);

        match self.mailer.send(&message).await {
            Ok(()) => {
                let sent_at = self.clock.utc();
                self.coupons.mark_sent(coupon.id, sent_at).await?;
                self.jobs.complete(job.id, sent_at).await?;
                info!(
                    "Sent {} coupon email for coupon {} to {}",
                    payload.sentiment,
                    coupon.id,
                    email_fingerprint(&payload.recipient)
                );
                Ok(JobOutcome::Sent)
            }
            Err(e) => {
                let failed_at = self.clock.utc();
                let attempts = job.attempts + 1;
                let reason = e.to_string();
                error!(
                    "Coupon email for coupon {} failed (attempt {}/{}): {}",
                    coupon.id, attempts, self.config.max_attempts, reason
                );
                if attempts < self.config.max_attempts {
                    self.jobs
                        .reschedule(job.id, attempts, &reason, failed_at + retry_delay(attempts))
                        .await?;
                    Ok(JobOutcome::Retried)
                } else {
                    self.jobs.mark_failed(job.id, attempts, &reason, failed_at).await?;
                    Ok(JobOutcome::Failed)
                }
            }
        }
    }

    /// Intro paragraph: generated for `assist` tone, template otherwise
    ///
    /// Generation never fails the send; any problem falls back to the template.
    pub async fn write_intro(&self, payload: &NotificationPayload) -> String {
        if payload.email_tone == EmailTone::Manual {
            return generic_intro(payload);
        }

        match self.generator.generate_text(&personalization_prompt(payload)).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("Generated intro unusable, using template");
                generic_intro(payload)
            }
            Err(e) => {
                warn!("Intro generation failed, using template: {}", e);
                generic_intro(payload)
            }
        }
    }
}
