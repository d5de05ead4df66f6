// HTTP handlers for coupon policy endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::policies::models::{CouponPolicy, SentimentType, SetPolicyRequest, SetPolicyResponse};
use crate::AppState;

/// List the coupon policies of an owned restaurant
#[utoipa::path(
    get,
    path = "/api/restaurants/{id}/coupon-policies",
    params(("id" = Uuid, Path, description = "Restaurant id")),
    responses(
        (status = 200, description = "Zero, one or two policies", body = Vec<CouponPolicy>),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer" = [])),
    tag = "coupon-policies"
)]
pub async fn list_policies(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<Vec<CouponPolicy>>, ApiError> {
    let policies = state
        .policy_service
        .get_policies(&current.user, restaurant_id)
        .await?;
    Ok(Json(policies))
}

/// Create or replace the policy for one sentiment
#[utoipa::path(
    put,
    path = "/api/restaurants/{id}/coupon-policies/{sentiment}",
    params(
        ("id" = Uuid, Path, description = "Restaurant id"),
        ("sentiment" = SentimentType, Path, description = "positive or negative")
    ),
    request_body = SetPolicyRequest,
    responses(
        (status = 200, description = "Policy saved", body = SetPolicyResponse),
        (status = 400, description = "Blank title or reward, or unsupported delay"),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer" = [])),
    tag = "coupon-policies"
)]
pub async fn set_policy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((restaurant_id, sentiment)): Path<(Uuid, SentimentType)>,
    ApiJson(request): ApiJson<SetPolicyRequest>,
) -> Result<Json<SetPolicyResponse>, ApiError> {
    request.validate()?;

    let policy_id = state
        .policy_service
        .set_policy(&current.user, restaurant_id, sentiment, request)
        .await?;
    Ok(Json(SetPolicyResponse { policy_id }))
}
