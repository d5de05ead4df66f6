// Star rating rules shared by intake and sentiment routing

use crate::error::ApiError;
use crate::reviews::models::LikedCategory;

pub const MIN_STARS: i16 = 1;
pub const MAX_STARS: i16 = 5;

/// Floor then clamp a submitted rating into 1..=5
///
/// Out-of-range input is clamped, never rejected. Only non-finite
/// values, which JSON cannot carry, are refused.
pub fn clamp_stars(stars: f64) -> Result<i16, ApiError> {
    if !stars.is_finite() {
        return Err(ApiError::validation("stars", "Stars must be a finite number"));
    }
    let floored = stars.floor().clamp(MIN_STARS as f64, MAX_STARS as f64);
    Ok(floored as i16)
}

/// Four and five star reviews are routed to the public review site
pub fn is_public(stars: i16) -> bool {
    stars >= 4
}

/// Liked categories worth keeping: deduplicated, first occurrence wins
pub fn distinct_categories(categories: &[LikedCategory]) -> Vec<LikedCategory> {
    let mut distinct = Vec::with_capacity(categories.len());
    for category in categories {
        if !distinct.contains(category) {
            distinct.push(*category);
        }
    }
    distinct
}
