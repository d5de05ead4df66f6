use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::ai::TextGenerator;
use crate::auth::User;
use crate::error::ApiError;
use crate::insights::models::{Insight, InsightDraft, TimeRange};
use crate::insights::repository::InsightRepository;
use crate::restaurants::RestaurantService;
use crate::reviews::{Review, ReviewRepository};
use crate::SharedClock;

/// Reviews fetched before windowing
pub const INSIGHT_FETCH_LIMIT: i64 = 200;
/// Reviews included in a prompt
pub const INSIGHT_PROMPT_LIMIT: usize = 120;

/// Reviews inside the window, newest first, capped for the prompt
pub fn reviews_in_window(
    reviews: Vec<Review>,
    time_range: TimeRange,
    now: DateTime<Utc>,
) -> Vec<Review> {
    let since = time_range.since(now);
    reviews
        .into_iter()
        .filter(|review| since.map_or(true, |since| review.created_at >= since))
        .take(INSIGHT_PROMPT_LIMIT)
        .collect()
}

/// Prompt asking for a JSON analysis of the given reviews
pub fn build_prompt(restaurant_name: &str, time_range: TimeRange, reviews: &[Review]) -> String {
    let mut lines = vec![
        "You analyze restaurant customer feedback.".to_string(),
        "Return JSON only (no markdown, no code fences) with keys:".to_string(),
        "- sentimentSummary: string (short paragraph)".to_string(),
        "- keyComplaints: string[] (max 5)".to_string(),
        "- suggestions: string[] (max 5, actionable)".to_string(),
        String::new(),
        format!("Restaurant: {restaurant_name}"),
        format!("Time range: {time_range}"),
        String::new(),
        "Reviews:".to_string(),
    ];
    lines.extend(reviews.iter().map(|review| {
        let text = review.feedback_text.as_deref().unwrap_or_default().trim();
        format!("{}★ {}", review.stars, text).trim().to_string()
    }));
    lines.join("\n")
}

/// Service layer for feedback insights
#[derive(Clone)]
pub struct InsightService {
    repository: InsightRepository,
    reviews: ReviewRepository,
    restaurants: RestaurantService,
    generator: Arc<dyn TextGenerator>,
    clock: SharedClock,
}

impl InsightService {
    /// Create a new InsightService
    pub fn new(
        repository: InsightRepository,
        reviews: ReviewRepository,
        restaurants: RestaurantService,
        generator: Arc<dyn TextGenerator>,
        clock: SharedClock,
    ) -> Self {
        Self {
            repository,
            reviews,
            restaurants,
            generator,
            clock,
        }
    }

    /// Analyze recent reviews and replace the cached insight
    ///
    /// On any generation failure the previous cached insight is left as is.
    pub async fn generate(
        &self,
        owner: &User,
        restaurant_id: Uuid,
        time_range: TimeRange,
    ) -> Result<Insight, ApiError> {
        let restaurant = self.restaurants.load_owned(owner, restaurant_id).await?;
        let now = self.clock.utc();

        let recent = self
            .reviews
            .list_recent(restaurant.id, INSIGHT_FETCH_LIMIT)
            .await?;
        let reviews = reviews_in_window(recent, time_range, now);
        let prompt = build_prompt(&restaurant.name, time_range, &reviews);

        let document = self.generator.generate_json(&prompt).await?;
        let draft = InsightDraft::from_value(&document)?;

        let insight = self
            .repository
            .upsert(restaurant.id, time_range, &draft, now)
            .await?;
        info!(
            "Generated {} insight for restaurant {} from {} reviews",
            time_range,
            restaurant.id,
            reviews.len()
        );
        Ok(insight)
    }

    /// Cached insight, if one was ever generated
    pub async fn get_cached(
        &self,
        owner: &User,
        restaurant_id: Uuid,
        time_range: TimeRange,
    ) -> Result<Option<Insight>, ApiError> {
        let restaurant = self.restaurants.load_owned(owner, restaurant_id).await?;
        self.repository.find(restaurant.id, time_range).await
    }
}
