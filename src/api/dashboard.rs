//! Dashboard endpoints (admin only)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::LimitQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ActivityResponse, GrowthResponse, StatsResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/recent-activity", get(recent_activity))
        .route("/user-growth", get(user_growth))
}

/// GET /api/v1/dashboard/stats
async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.dashboard_service.stats().await?;
    Ok(Json(StatsResponse { stats }))
}

/// GET /api/v1/dashboard/recent-activity?limit=
async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let activity = state.dashboard_service.recent_activity(query.limit).await?;
    Ok(Json(ActivityResponse { activity }))
}

/// GET /api/v1/dashboard/user-growth
async fn user_growth(State(state): State<AppState>) -> Result<Json<GrowthResponse>, ApiError> {
    let growth = state.dashboard_service.user_growth().await?;
    Ok(Json(GrowthResponse { growth }))
}
