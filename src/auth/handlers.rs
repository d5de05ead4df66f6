// HTTP handlers for the caller's own owner record

use axum::{extract::State, Json};
use validator::Validate;

use crate::auth::{
    middleware::CurrentUser,
    models::{UpdateProfileRequest, User},
};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;

/// Get the current owner, creating it on first sight
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current owner", body = User),
        (status = 401, description = "Missing or invalid session token")
    ),
    security(("bearer" = [])),
    tag = "identity"
)]
pub async fn get_me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

/// Overwrite the current owner's profile
#[utoipa::path(
    put,
    path = "/api/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Invalid profile data"),
        (status = 401, description = "Missing or invalid session token")
    ),
    security(("bearer" = [])),
    tag = "identity"
)]
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    request.validate()?;

    let user = state
        .identity_resolver
        .update_profile(&current.user, &current.identity, request)
        .await?;
    Ok(Json(user))
}
