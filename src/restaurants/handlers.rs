// HTTP handlers for restaurant endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::restaurants::models::{
    CreateRestaurantRequest, PublicRestaurantView, Restaurant, UpdateRestaurantRequest,
};
use crate::AppState;

/// Public restaurant page data behind a QR code
#[utoipa::path(
    get,
    path = "/api/public/restaurants/{public_id}/{slug}",
    params(
        ("public_id" = String, Path, description = "Restaurant public id"),
        ("slug" = String, Path, description = "Restaurant slug, normalized before lookup")
    ),
    responses(
        (status = 200, description = "Restaurant found", body = PublicRestaurantView),
        (status = 404, description = "No restaurant for this public key")
    ),
    tag = "public"
)]
pub async fn get_public_restaurant(
    State(state): State<AppState>,
    Path((public_id, slug)): Path<(String, String)>,
) -> Result<Json<PublicRestaurantView>, ApiError> {
    tracing::debug!("Public lookup for restaurant {}/{}", public_id, slug);

    state
        .restaurant_service
        .get_public(&public_id, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Restaurant", format!("{}/{}", public_id, slug)))
}

/// List the caller's restaurants
#[utoipa::path(
    get,
    path = "/api/restaurants",
    responses(
        (status = 200, description = "Owned restaurants, oldest first", body = Vec<Restaurant>),
        (status = 401, description = "Missing or invalid session token")
    ),
    security(("bearer" = [])),
    tag = "restaurants"
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Restaurant>>, ApiError> {
    let restaurants = state.restaurant_service.list_owned(&current.user).await?;
    tracing::debug!("User {} owns {} restaurants", current.user.id, restaurants.len());
    Ok(Json(restaurants))
}

/// Create a restaurant
#[utoipa::path(
    post,
    path = "/api/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = Restaurant),
        (status = 400, description = "Invalid name, slug or URL"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 409, description = "Slug already used by this owner, or public id allocation exhausted")
    ),
    security(("bearer" = [])),
    tag = "restaurants"
)]
pub async fn create_restaurant(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateRestaurantRequest>,
) -> Result<(StatusCode, Json<Restaurant>), ApiError> {
    request.validate()?;

    let restaurant = state
        .restaurant_service
        .create(&current.user, request)
        .await?;
    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// Get one owned restaurant
#[utoipa::path(
    get,
    path = "/api/restaurants/{id}",
    params(("id" = Uuid, Path, description = "Restaurant id")),
    responses(
        (status = 200, description = "Restaurant found", body = Restaurant),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer" = [])),
    tag = "restaurants"
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Restaurant>, ApiError> {
    let restaurant = state.restaurant_service.load_owned(&current.user, id).await?;
    Ok(Json(restaurant))
}

/// Partially update an owned restaurant
#[utoipa::path(
    patch,
    path = "/api/restaurants/{id}",
    params(("id" = Uuid, Path, description = "Restaurant id")),
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant updated", body = Restaurant),
        (status = 400, description = "Invalid name, slug or URL"),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found"),
        (status = 409, description = "Slug already used by this owner")
    ),
    security(("bearer" = [])),
    tag = "restaurants"
)]
pub async fn update_restaurant(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateRestaurantRequest>,
) -> Result<Json<Restaurant>, ApiError> {
    request.validate()?;

    let restaurant = state
        .restaurant_service
        .update(&current.user, id, request)
        .await?;
    Ok(Json(restaurant))
}
