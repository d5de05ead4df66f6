use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle of a customer coupon
///
/// Derived from the stored `(is_redeemed, sent_at)` pair; `Redeemed` wins
/// over `Sent` because delivery does not gate redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponState {
    Issued,
    Sent,
    Redeemed,
}

impl CouponState {
    pub fn of(is_redeemed: bool, sent_at: Option<DateTime<Utc>>) -> Self {
        match (is_redeemed, sent_at) {
            (true, _) => CouponState::Redeemed,
            (false, Some(_)) => CouponState::Sent,
            (false, None) => CouponState::Issued,
        }
    }
}

impl fmt::Display for CouponState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponState::Issued => write!(f, "issued"),
            CouponState::Sent => write!(f, "sent"),
            CouponState::Redeemed => write!(f, "redeemed"),
        }
    }
}

/// Service for checking coupon state transitions
pub struct CouponStateMachine;

impl CouponStateMachine {
    /// Check if a state transition is valid
    ///
    /// # Valid Transitions
    /// - Issued → Sent, Redeemed
    /// - Sent → Redeemed
    /// - Redeemed → (terminal)
    pub fn is_valid_transition(from: CouponState, to: CouponState) -> bool {
        matches!(
            (from, to),
            (CouponState::Issued, CouponState::Sent)
                | (CouponState::Issued, CouponState::Redeemed)
                | (CouponState::Sent, CouponState::Redeemed)
        )
    }

    /// Attempt to transition from one state to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: CouponState, to: CouponState) -> Result<CouponState, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid coupon transition from {} to {}", from, to))
        }
    }

    /// Whether a coupon in `state` can still be redeemed
    pub fn can_redeem(state: CouponState) -> bool {
        Self::is_valid_transition(state, CouponState::Redeemed)
    }
}
