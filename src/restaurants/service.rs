use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::User;
use crate::error::{unique_violation, ApiError};
use crate::identifiers::{generate_public_id, normalize_slug, MAX_GENERATION_ATTEMPTS};
use crate::restaurants::models::{
    CreateRestaurantRequest, PublicRestaurantView, Restaurant, RestaurantFields,
    UpdateRestaurantRequest,
};
use crate::restaurants::repository::RestaurantRepository;
use crate::validation::{is_http_url, trim_to_option};
use crate::SharedClock;

const PUBLIC_ID_CONSTRAINT: &str = "restaurants_public_id_key";
const OWNER_SLUG_CONSTRAINT: &str = "restaurants_owner_slug_key";

/// Fails with `Forbidden` unless `user` owns `restaurant`
pub fn assert_ownership(user: &User, restaurant: &Restaurant) -> Result<(), ApiError> {
    if restaurant.owner_id != user.id {
        warn!(
            "User {} attempted to access restaurant {} owned by another user",
            user.id, restaurant.id
        );
        return Err(ApiError::Forbidden(
            "You do not own this restaurant".to_string(),
        ));
    }
    Ok(())
}

fn require_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("name", "Name is required"));
    }
    Ok(name.to_string())
}

fn require_review_url(url: &str) -> Result<String, ApiError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ApiError::validation("reviewUrl", "Review URL is required"));
    }
    if !is_http_url(url) {
        return Err(ApiError::validation(
            "reviewUrl",
            "Review URL must start with http:// or https://",
        ));
    }
    Ok(url.to_string())
}

fn require_slug(input: &str) -> Result<String, ApiError> {
    let slug = normalize_slug(input);
    if slug.is_empty() {
        return Err(ApiError::validation("slug", "Invalid slug"));
    }
    Ok(slug)
}

/// Validate and normalize the fields of a new restaurant
pub fn fields_for_create(request: CreateRestaurantRequest) -> Result<RestaurantFields, ApiError> {
    Ok(RestaurantFields {
        name: require_name(&request.name)?,
        slug: require_slug(&request.slug)?,
        review_url: require_review_url(&request.review_url)?,
        email_tone: request.email_tone,
        logo_url: trim_to_option(request.logo_url),
    })
}

/// Apply a partial update on top of the stored row, validating each given field
pub fn fields_for_update(
    existing: &Restaurant,
    request: UpdateRestaurantRequest,
) -> Result<RestaurantFields, ApiError> {
    Ok(RestaurantFields {
        name: match request.name {
            Some(name) => require_name(&name)?,
            None => existing.name.clone(),
        },
        slug: match request.slug {
            Some(slug) => require_slug(&slug)?,
            None => existing.slug.clone(),
        },
        review_url: match request.review_url {
            Some(url) => require_review_url(&url)?,
            None => existing.review_url.clone(),
        },
        email_tone: request.email_tone.unwrap_or(existing.email_tone),
        logo_url: match request.logo_url {
            Some(logo) => trim_to_option(Some(logo)),
            None => existing.logo_url.clone(),
        },
    })
}

/// Service layer for the restaurant registry
#[derive(Clone)]
pub struct RestaurantService {
    repository: RestaurantRepository,
    clock: SharedClock,
}

impl RestaurantService {
    /// Create a new RestaurantService
    pub fn new(repository: RestaurantRepository, clock: SharedClock) -> Self {
        Self { repository, clock }
    }

    /// Create a restaurant owned by `owner`
    ///
    /// The public id is sampled until an insert succeeds; the unique
    /// constraints decide both public-id and per-owner slug collisions.
    pub async fn create(
        &self,
        owner: &User,
        request: CreateRestaurantRequest,
    ) -> Result<Restaurant, ApiError> {
        let fields = fields_for_create(request)?;
        let now = self.clock.utc();

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let public_id = generate_public_id();
            match self.repository.insert(owner.id, &public_id, &fields, now).await {
                Ok(restaurant) => {
                    info!(
                        "Created restaurant {} ({}/{}) for user {}",
                        restaurant.id, restaurant.public_id, restaurant.slug, owner.id
                    );
                    return Ok(restaurant);
                }
                Err(e) => match unique_violation(&e).as_deref() {
                    Some(OWNER_SLUG_CONSTRAINT) => {
                        return Err(ApiError::SlugConflict { slug: fields.slug });
                    }
                    Some(PUBLIC_ID_CONSTRAINT) => {
                        debug!("Public id collision on attempt {}", attempt);
                    }
                    _ => return Err(e.into()),
                },
            }
        }

        Err(ApiError::IdGenerationExhausted)
    }

    /// Apply a partial update to an owned restaurant
    pub async fn update(
        &self,
        owner: &User,
        restaurant_id: Uuid,
        request: UpdateRestaurantRequest,
    ) -> Result<Restaurant, ApiError> {
        let existing = self.load_owned(owner, restaurant_id).await?;
        let fields = fields_for_update(&existing, request)?;

        match self.repository.update(existing.id, &fields).await {
            Ok(restaurant) => {
                info!("Updated restaurant {}", restaurant.id);
                Ok(restaurant)
            }
            Err(e) if unique_violation(&e).as_deref() == Some(OWNER_SLUG_CONSTRAINT) => {
                Err(ApiError::SlugConflict { slug: fields.slug })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Public lookup by (publicId, slug); the slug is normalized first
    pub async fn get_public(
        &self,
        public_id: &str,
        slug: &str,
    ) -> Result<Option<PublicRestaurantView>, ApiError> {
        Ok(self
            .find_by_public_key(public_id, slug)
            .await?
            .map(PublicRestaurantView::from))
    }

    /// Full restaurant row for a public key, for server-side workflows
    pub async fn find_by_public_key(
        &self,
        public_id: &str,
        slug: &str,
    ) -> Result<Option<Restaurant>, ApiError> {
        let slug = normalize_slug(slug);
        let public_id = public_id.trim();
        if slug.is_empty() || public_id.is_empty() {
            return Ok(None);
        }
        self.repository.find_by_public_key(public_id, &slug).await
    }

    /// Restaurants owned by `owner`, possibly none
    pub async fn list_owned(&self, owner: &User) -> Result<Vec<Restaurant>, ApiError> {
        self.repository.list_by_owner(owner.id).await
    }

    /// Load a restaurant and check that `owner` owns it
    pub async fn load_owned(&self, owner: &User, restaurant_id: Uuid) -> Result<Restaurant, ApiError> {
        let restaurant = self
            .repository
            .find_by_id(restaurant_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Restaurant", restaurant_id))?;
        assert_ownership(owner, &restaurant)?;
        Ok(restaurant)
    }
}
