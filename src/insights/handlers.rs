// HTTP handlers for feedback insights

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::insights::models::{Insight, TimeRange};
use crate::AppState;

/// Generate (or regenerate) the insight for a window
#[utoipa::path(
    post,
    path = "/api/restaurants/{id}/insights/{time_range}",
    params(
        ("id" = Uuid, Path, description = "Restaurant id"),
        ("time_range" = TimeRange, Path, description = "daily, monthly or all")
    ),
    responses(
        (status = 200, description = "Freshly generated insight", body = Insight),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found"),
        (status = 502, description = "Text generation failed or returned unusable data")
    ),
    security(("bearer" = [])),
    tag = "insights"
)]
pub async fn generate_insight(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((restaurant_id, time_range)): Path<(Uuid, TimeRange)>,
) -> Result<Json<Insight>, ApiError> {
    let insight = state
        .insight_service
        .generate(&current.user, restaurant_id, time_range)
        .await?;
    Ok(Json(insight))
}

/// Cached insight for a window, `null` if never generated
#[utoipa::path(
    get,
    path = "/api/restaurants/{id}/insights/{time_range}",
    params(
        ("id" = Uuid, Path, description = "Restaurant id"),
        ("time_range" = TimeRange, Path, description = "daily, monthly or all")
    ),
    responses(
        (status = 200, description = "Cached insight or null", body = Option<Insight>),
        (status = 403, description = "Restaurant belongs to another owner"),
        (status = 404, description = "Restaurant not found")
    ),
    security(("bearer" = [])),
    tag = "insights"
)]
pub async fn get_insight(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((restaurant_id, time_range)): Path<(Uuid, TimeRange)>,
) -> Result<Json<Option<Insight>>, ApiError> {
    let insight = state
        .insight_service
        .get_cached(&current.user, restaurant_id, time_range)
        .await?;
    Ok(Json(insight))
}
