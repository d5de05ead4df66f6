// HTTP handlers for review endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::reviews::models::{
    ListReviewsQuery, Review, ReviewPage, ReviewPageQuery, SubmitReviewRequest, SubmitReviewResponse,
};
use crate::AppState;

/// Submit a review from the public review page
///
/// 201 when a new coupon was issued, 200 otherwise.
#[utoipa::path(
    post,
    path = "/api/public/reviews",
    request_body = SubmitReviewRequest,
    responses(
        (status = 201, description = "Review stored and coupon issued", body = SubmitReviewResponse),
        (status = 200, description = "Review stored, no new coupon", body = SubmitReviewResponse),
        (status = 400, description = "Invalid email or feedback too long"),
        (status = 404, description = "Restaurant not found")
    ),
    tag = "reviews"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<SubmitReviewResponse>), ApiError> {
    request.validate()?;

    let response = state.review_service.submit(request).await?;
    let status = if response.coupon_code.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// Newest reviews of an owned restaurant
#[utoipa::path(
    get,
    path = "/api/restaurants/{id}/reviews",
    params(("id" = Uuid, Path, description = "Restaurant id"), ListReviewsQuery),
    responses(
        (status = 200, description = "Reviews, newest first", body = Vec<Review>),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer" = [])),
    tag = "reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(restaurant_id): Path<Uuid>,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews = state
        .review_service
        .list(&current.user, restaurant_id, query)
        .await?;
    Ok(Json(reviews))
}

/// Paginated reviews of an owned restaurant
#[utoipa::path(
    get,
    path = "/api/restaurants/{id}/reviews/page",
    params(("id" = Uuid, Path, description = "Restaurant id"), ReviewPageQuery),
    responses(
        (status = 200, description = "One page of reviews", body = ReviewPage),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer" = [])),
    tag = "reviews"
)]
pub async fn list_review_page(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(restaurant_id): Path<Uuid>,
    Query(query): Query<ReviewPageQuery>,
) -> Result<Json<ReviewPage>, ApiError> {
    let page = state
        .review_service
        .list_page(&current.user, restaurant_id, query)
        .await?;
    Ok(Json(page))
}
