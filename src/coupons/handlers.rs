// HTTP handlers for coupon verification and redemption

use axum::{
    extract::{Query, State},
    Json,
};

use crate::auth::CurrentUser;
use crate::coupons::models::{
    OwnerRedemption, RedeemRequest, RedemptionResult, VerificationResult, VerifyQuery,
};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;

/// Redeem a coupon at the point of sale
///
/// Unauthenticated: possession of the code is what staff trust.
#[utoipa::path(
    post,
    path = "/api/public/coupons/redeem",
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Redeemed now or earlier", body = RedemptionResult),
        (status = 400, description = "Malformed coupon code"),
        (status = 404, description = "Unknown coupon code")
    ),
    tag = "coupons"
)]
pub async fn redeem_public(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RedeemRequest>,
) -> Result<Json<RedemptionResult>, ApiError> {
    let result = state.coupon_service.redeem_by_code(&request.coupon_code).await?;
    Ok(Json(result))
}

/// Look up a code before redeeming it
#[utoipa::path(
    get,
    path = "/api/coupons/verify",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Lookup outcome, including mismatches", body = VerificationResult),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = [])),
    tag = "coupons"
)]
pub async fn verify_coupon(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerificationResult>, ApiError> {
    let result = state
        .coupon_service
        .verify_for_owner(&current.user, &query.code)
        .await?;
    Ok(Json(result))
}

/// Redeem a coupon of one of the caller's restaurants
#[utoipa::path(
    post,
    path = "/api/coupons/redeem",
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Coupon redeemed", body = OwnerRedemption),
        (status = 400, description = "Malformed coupon code"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Coupon belongs to another owner's restaurant"),
        (status = 404, description = "Unknown coupon code"),
        (status = 409, description = "Coupon already redeemed")
    ),
    security(("bearer" = [])),
    tag = "coupons"
)]
pub async fn redeem_as_owner(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<RedeemRequest>,
) -> Result<Json<OwnerRedemption>, ApiError> {
    let result = state
        .coupon_service
        .redeem_as_owner(&current.user, &request.coupon_code)
        .await?;
    Ok(Json(result))
}
