use tracing::info;
use uuid::Uuid;

use crate::auth::User;
use crate::error::ApiError;
use crate::policies::models::{CouponPolicy, PolicyFields, SentimentType, SetPolicyRequest};
use crate::policies::repository::PolicyRepository;
use crate::restaurants::RestaurantService;
use crate::validation::trim_to_option;
use crate::SharedClock;

/// Delay applied when a restaurant has no policy for the sentiment
pub const DEFAULT_DELAY_WITHOUT_POLICY: i64 = 1;

/// Minutes to wait before sending a coupon email
///
/// A policy row without a stored delay predates configurable delays and
/// sends immediately. No policy row at all waits one minute.
pub fn resolve_send_delay(policy: Option<&CouponPolicy>) -> i64 {
    match policy {
        Some(policy) => policy.send_delay_minutes.map(i64::from).unwrap_or(0),
        None => DEFAULT_DELAY_WITHOUT_POLICY,
    }
}

/// Trim and require title and reward
pub fn policy_fields(request: SetPolicyRequest) -> Result<PolicyFields, ApiError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::validation("title", "Title is required"));
    }
    let reward = request.reward.trim().to_string();
    if reward.is_empty() {
        return Err(ApiError::validation("reward", "Reward is required"));
    }

    Ok(PolicyFields {
        title,
        description: trim_to_option(request.description),
        reward,
        is_single_use: request.is_single_use,
        send_delay: request.send_delay_minutes,
    })
}

/// Service layer for the coupon policy store
#[derive(Clone)]
pub struct PolicyService {
    repository: PolicyRepository,
    restaurants: RestaurantService,
    clock: SharedClock,
}

impl PolicyService {
    /// Create a new PolicyService
    pub fn new(
        repository: PolicyRepository,
        restaurants: RestaurantService,
        clock: SharedClock,
    ) -> Self {
        Self {
            repository,
            restaurants,
            clock,
        }
    }

    /// Create or replace the policy for one sentiment of an owned restaurant
    pub async fn set_policy(
        &self,
        owner: &User,
        restaurant_id: Uuid,
        sentiment: SentimentType,
        request: SetPolicyRequest,
    ) -> Result<Uuid, ApiError> {
        let restaurant = self.restaurants.load_owned(owner, restaurant_id).await?;
        let fields = policy_fields(request)?;

        let policy = self
            .repository
            .upsert(restaurant.id, sentiment, &fields, self.clock.utc())
            .await?;
        info!(
            "Saved {} coupon policy {} for restaurant {}",
            sentiment, policy.id, restaurant.id
        );
        Ok(policy.id)
    }

    /// All policies of an owned restaurant
    pub async fn get_policies(
        &self,
        owner: &User,
        restaurant_id: Uuid,
    ) -> Result<Vec<CouponPolicy>, ApiError> {
        let restaurant = self.restaurants.load_owned(owner, restaurant_id).await?;
        self.repository.list_for_restaurant(restaurant.id).await
    }

    /// Policy lookup for server-side workflows, no ownership check
    pub async fn find_for_sentiment(
        &self,
        restaurant_id: Uuid,
        sentiment: SentimentType,
    ) -> Result<Option<CouponPolicy>, ApiError> {
        self.repository.find_for_sentiment(restaurant_id, sentiment).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::models::SendDelay;
    use crate::test_support::fixed_now;

    fn policy(delay: Option<i32>) -> CouponPolicy {
        CouponPolicy {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            sentiment_type: SentimentType::Positive,
            title: "Thank you".to_string(),
            description: None,
            reward: "10% off".to_string(),
            is_single_use: true,
            send_delay_minutes: delay,
            created_at: fixed_now(),
        }
    }

    fn request() -> SetPolicyRequest {
        SetPolicyRequest {
            title: "  Free dessert ".to_string(),
            description: Some("   ".to_string()),
            reward: " One dessert ".to_string(),
            is_single_use: true,
            send_delay_minutes: SendDelay::TwoMinutes,
        }
    }

    #[test]
    fn test_resolve_send_delay_without_policy_is_one_minute() {
        assert_eq!(resolve_send_delay(None), 1);
    }

    #[test]
    fn test_resolve_send_delay_legacy_policy_is_immediate() {
        assert_eq!(resolve_send_delay(Some(&policy(None))), 0);
    }

    #[test]
    fn test_resolve_send_delay_uses_stored_value() {
        assert_eq!(resolve_send_delay(Some(&policy(Some(5)))), 5);
        assert_eq!(resolve_send_delay(Some(&policy(Some(0)))), 0);
    }

    #[test]
    fn test_policy_fields_trims() {
        let fields = policy_fields(request()).unwrap();
        assert_eq!(fields.title, "Free dessert");
        assert_eq!(fields.reward, "One dessert");
        assert_eq!(fields.description, None);
        assert_eq!(fields.send_delay, SendDelay::TwoMinutes);
    }

    #[test]
    fn test_policy_fields_requires_title_and_reward() {
        let mut blank_title = request();
        blank_title.title = "  ".to_string();
        assert!(matches!(
            policy_fields(blank_title),
            Err(ApiError::Validation { field, .. }) if field == "title"
        ));

        let mut blank_reward = request();
        blank_reward.reward = String::new();
        assert!(matches!(
            policy_fields(blank_reward),
            Err(ApiError::Validation { field, .. }) if field == "reward"
        ));
    }

    #[test]
    fn test_send_delay_accepts_only_enumerated_values() {
        for minutes in [0, 1, 2, 5] {
            let delay: SendDelay = serde_json::from_value(serde_json::json!(minutes)).unwrap();
            assert_eq!(delay.minutes(), minutes);
        }
        for minutes in [-1, 3, 4, 10] {
            assert!(serde_json::from_value::<SendDelay>(serde_json::json!(minutes)).is_err());
        }
    }

    #[test]
    fn test_sentiment_from_stars() {
        for stars in 1..=3 {
            assert_eq!(SentimentType::from_stars(stars), SentimentType::Negative);
        }
        for stars in 4..=5 {
            assert_eq!(SentimentType::from_stars(stars), SentimentType::Positive);
        }
    }
}
