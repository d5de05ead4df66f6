use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::User;
use crate::coupons::models::{
    CouponDetails, OwnerRedemption, RedemptionResult, RedemptionStatus, VerificationResult,
    VerificationStatus,
};
use crate::coupons::repository::CouponRepository;
use crate::coupons::state_machine::{CouponState, CouponStateMachine};
use crate::error::ApiError;
use crate::identifiers::normalize_coupon_code;
use crate::SharedClock;

/// Build the redemption response for a coupon in a known state
pub fn redemption_result(
    details: &CouponDetails,
    status: RedemptionStatus,
    redeemed_at: Option<DateTime<Utc>>,
) -> RedemptionResult {
    RedemptionResult {
        status,
        redeemed_at,
        restaurant_name: details.restaurant_name.clone(),
        sentiment_type: details.sentiment_type(),
        offer_title: details.offer_title.clone(),
        offer_discount_value: details.offer_reward.clone(),
    }
}

/// Classify a found coupon for an owner's lookup
pub fn verification_result(owner_id: Uuid, details: CouponDetails) -> VerificationResult {
    let Some(restaurant_name) = details.restaurant_name.clone() else {
        return VerificationResult::rejected(VerificationStatus::Invalid, "Restaurant not found");
    };
    if details.owner_id != Some(owner_id) {
        return VerificationResult::rejected(
            VerificationStatus::Unauthorized,
            "This coupon is not for your restaurant",
        );
    }

    let state = CouponState::of(details.is_redeemed, details.sent_at);
    let status = if CouponStateMachine::can_redeem(state) {
        VerificationStatus::Valid
    } else {
        VerificationStatus::AlreadyRedeemed
    };
    let sentiment_type = details.sentiment_type();

    VerificationResult {
        status,
        message: None,
        coupon_code: Some(details.coupon_code),
        restaurant_name: Some(restaurant_name),
        customer_email: Some(details.email),
        sentiment_type,
        offer_title: details.offer_title,
        offer_discount_value: details.offer_reward,
        is_redeemed: Some(details.is_redeemed),
        redeemed_at: details.redeemed_at,
        sent_at: details.sent_at,
        review_stars: details.review_stars,
    }
}

enum RedeemOutcome {
    Redeemed(DateTime<Utc>),
    AlreadyRedeemed(Option<DateTime<Utc>>),
}

/// Service layer for coupon verification and redemption
#[derive(Clone)]
pub struct CouponService {
    repository: CouponRepository,
    clock: SharedClock,
}

impl CouponService {
    /// Create a new CouponService
    pub fn new(repository: CouponRepository, clock: SharedClock) -> Self {
        Self { repository, clock }
    }

    /// Staff-facing redemption by code, no login required
    ///
    /// Replaying a redeemed code is not an error: the first redemption
    /// time is returned unchanged.
    pub async fn redeem_by_code(&self, input: &str) -> Result<RedemptionResult, ApiError> {
        let code = normalize_coupon_code(input).ok_or(ApiError::InvalidCode)?;
        let details = self
            .repository
            .find_details_by_code(&code)
            .await?
            .ok_or_else(|| ApiError::not_found("Coupon", &code))?;

        match self.try_redeem(&details).await? {
            RedeemOutcome::Redeemed(redeemed_at) => {
                info!("Redeemed coupon {} for restaurant {}", details.id, details.restaurant_id);
                Ok(redemption_result(&details, RedemptionStatus::Redeemed, Some(redeemed_at)))
            }
            RedeemOutcome::AlreadyRedeemed(previous) => {
                debug!("Coupon {} was already redeemed", details.id);
                Ok(redemption_result(&details, RedemptionStatus::AlreadyRedeemed, previous))
            }
        }
    }

    /// Owner lookup of a code; expected mismatches come back as a status
    pub async fn verify_for_owner(
        &self,
        owner: &User,
        input: &str,
    ) -> Result<VerificationResult, ApiError> {
        if input.trim().is_empty() {
            return Ok(VerificationResult::rejected(
                VerificationStatus::Invalid,
                "Please enter a coupon code",
            ));
        }
        let Some(code) = normalize_coupon_code(input) else {
            return Ok(VerificationResult::rejected(
                VerificationStatus::Invalid,
                "Invalid coupon code format",
            ));
        };

        let Some(details) = self.repository.find_details_by_code(&code).await? else {
            return Ok(VerificationResult::rejected(
                VerificationStatus::NotFound,
                "Coupon code not found in the system",
            ));
        };

        let result = verification_result(owner.id, details);
        if result.status == VerificationStatus::Unauthorized {
            warn!("User {} verified a coupon of another restaurant", owner.id);
        }
        Ok(result)
    }

    /// Owner-initiated redemption; every non-success outcome is an error
    pub async fn redeem_as_owner(
        &self,
        owner: &User,
        input: &str,
    ) -> Result<OwnerRedemption, ApiError> {
        let code = normalize_coupon_code(input).ok_or(ApiError::InvalidCode)?;
        let details = self
            .repository
            .find_details_by_code(&code)
            .await?
            .ok_or_else(|| ApiError::not_found("Coupon", &code))?;

        if details.owner_id != Some(owner.id) {
            warn!("User {} attempted to redeem coupon {} of another restaurant", owner.id, details.id);
            return Err(ApiError::Forbidden(
                "This coupon is not for your restaurant".to_string(),
            ));
        }

        match self.try_redeem(&details).await? {
            RedeemOutcome::Redeemed(redeemed_at) => {
                info!("Owner {} redeemed coupon {}", owner.id, details.id);
                Ok(OwnerRedemption {
                    success: true,
                    redeemed_at,
                })
            }
            RedeemOutcome::AlreadyRedeemed(previous) => Err(ApiError::AlreadyRedeemed {
                redeemed_at: previous,
            }),
        }
    }

    async fn try_redeem(&self, details: &CouponDetails) -> Result<RedeemOutcome, ApiError> {
        let state = CouponState::of(details.is_redeemed, details.sent_at);
        if CouponStateMachine::transition(state, CouponState::Redeemed).is_err() {
            return Ok(RedeemOutcome::AlreadyRedeemed(details.redeemed_at));
        }

        let now = self.clock.utc();
        match self.repository.redeem(&details.coupon_code, now).await? {
            Some(redeemed_at) => Ok(RedeemOutcome::Redeemed(redeemed_at)),
            None => {
                // Lost a race with a concurrent redemption
                let previous = self.repository.redeemed_at(&details.coupon_code).await?;
                Ok(RedeemOutcome::AlreadyRedeemed(previous))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::SentimentType;

    fn details(owner_id: Option<Uuid>) -> CouponDetails {
        CouponDetails {
            id: Uuid::new_v4(),
            coupon_code: "ABCD2345".to_string(),
            email: "guest@example.com".to_string(),
            restaurant_id: Uuid::new_v4(),
            is_redeemed: false,
            redeemed_at: None,
            sent_at: None,
            restaurant_name: owner_id.map(|_| "Chez Test".to_string()),
            owner_id,
            review_stars: Some(5),
            offer_title: Some("Free dessert".to_string()),
            offer_reward: Some("1 dessert".to_string()),
        }
    }

    #[test]
    fn test_valid_coupon_carries_details() {
        let owner = Uuid::new_v4();
        let result = verification_result(owner, details(Some(owner)));

        assert_eq!(result.status, VerificationStatus::Valid);
        assert!(result.message.is_none());
        assert_eq!(result.restaurant_name.as_deref(), Some("Chez Test"));
        assert_eq!(result.sentiment_type, Some(SentimentType::Positive));
        assert_eq!(result.offer_discount_value.as_deref(), Some("1 dessert"));
    }

    #[test]
    fn test_redeemed_coupon_is_reported_as_such() {
        let owner = Uuid::new_v4();
        let mut redeemed = details(Some(owner));
        redeemed.is_redeemed = true;
        redeemed.redeemed_at = Some(Utc::now());

        let result = verification_result(owner, redeemed);
        assert_eq!(result.status, VerificationStatus::AlreadyRedeemed);
        assert!(result.redeemed_at.is_some());
    }

    #[test]
    fn test_other_owner_is_unauthorized() {
        let result = verification_result(Uuid::new_v4(), details(Some(Uuid::new_v4())));
        assert_eq!(result.status, VerificationStatus::Unauthorized);
        assert!(result.coupon_code.is_none());
    }

    #[test]
    fn test_missing_restaurant_is_invalid() {
        let result = verification_result(Uuid::new_v4(), details(None));
        assert_eq!(result.status, VerificationStatus::Invalid);
        assert_eq!(result.message.as_deref(), Some("Restaurant not found"));
    }

    #[test]
    fn test_redemption_result_tolerates_deleted_review_and_policy() {
        let mut orphan = details(Some(Uuid::new_v4()));
        orphan.review_stars = None;
        orphan.offer_title = None;
        orphan.offer_reward = None;

        let result = redemption_result(&orphan, RedemptionStatus::Redeemed, Some(Utc::now()));
        assert_eq!(result.sentiment_type, None);
        assert_eq!(result.offer_title, None);
        assert_eq!(result.restaurant_name.as_deref(), Some("Chez Test"));
    }

    #[test]
    fn test_verification_serializes_flat() {
        let owner = Uuid::new_v4();
        let json = serde_json::to_value(verification_result(owner, details(Some(owner)))).unwrap();
        assert_eq!(json["status"], "valid");
        assert_eq!(json["couponCode"], "ABCD2345");
        assert_eq!(json["sentimentType"], "positive");
        assert!(json.get("message").is_none());

        let json = serde_json::to_value(VerificationResult::rejected(
            VerificationStatus::NotFound,
            "Coupon code not found in the system",
        ))
        .unwrap();
        assert_eq!(json["status"], "not_found");
        assert!(json.get("couponCode").is_none());
    }
}
