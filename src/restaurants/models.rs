use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// How customer notification copy is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmailTone {
    /// Personalized by the text-generation service, template fallback
    #[default]
    Assist,
    /// Deterministic templates only
    Manual,
}

/// Domain model representing a restaurant in the database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub public_id: String,
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub review_url: String,
    pub email_tone: EmailTone,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for creating a restaurant
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRestaurantRequest {
    #[validate(
        length(max = 255, message = "Name must not exceed 255 characters"),
        custom = "crate::validation::validate_not_blank"
    )]
    pub name: String,
    #[validate(length(max = 255, message = "Slug must not exceed 255 characters"))]
    pub slug: String,
    #[validate(custom = "crate::validation::validate_http_url")]
    pub review_url: String,
    #[serde(default)]
    pub email_tone: EmailTone,
    pub logo_url: Option<String>,
}

/// Request DTO for a partial restaurant update
///
/// Omitted fields keep their value. An empty `logoUrl` clears the logo.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRestaurantRequest {
    #[validate(
        length(max = 255, message = "Name must not exceed 255 characters"),
        custom = "crate::validation::validate_not_blank"
    )]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "Slug must not exceed 255 characters"))]
    pub slug: Option<String>,
    #[validate(custom = "crate::validation::validate_http_url")]
    pub review_url: Option<String>,
    pub email_tone: Option<EmailTone>,
    pub logo_url: Option<String>,
}

/// What an unauthenticated QR-code visitor may see
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicRestaurantView {
    pub public_id: String,
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub review_url: String,
}

impl From<Restaurant> for PublicRestaurantView {
    fn from(restaurant: Restaurant) -> Self {
        Self {
            public_id: restaurant.public_id,
            slug: restaurant.slug,
            name: restaurant.name,
            logo_url: restaurant.logo_url,
            review_url: restaurant.review_url,
        }
    }
}

/// Fully validated column values, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantFields {
    pub name: String,
    pub slug: String,
    pub review_url: String,
    pub email_tone: EmailTone,
    pub logo_url: Option<String>,
}
