//! Dashboard Routes

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use fleet_protocol::ApiResponse;
use fleet_state::DashboardStats;

use super::tracking::{live_snapshot, LiveQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::SharedState;

/// `GET /api/dashboard/stats`
pub async fn get_stats(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(params): Query<LiveQuery>,
) -> ApiResult<DashboardStats> {
    let scope = user.scope(params.organization_id.as_deref());
    let (vehicles, live, alerts) = live_snapshot(&state.read().await.repository, scope, Utc::now())?;
    Ok(Json(ApiResponse::ok(DashboardStats::compute(&vehicles, &live, &alerts))))
}
