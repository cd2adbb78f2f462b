//! Geofence Routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use fleet_protocol::ApiResponse;
use geofence::Geofence;
use serde::Deserialize;
use session_auth::can_manage_vehicles;
use storage::{GeofenceDraft, GeofencePatch};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceQuery {
    pub organization_id: Option<String>,
}

/// `GET /api/geofences`
pub async fn list_geofences(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(params): Query<GeofenceQuery>,
) -> ApiResult<Vec<Geofence>> {
    let scope = user.scope(params.organization_id.as_deref());
    let geofences = state.read().await.repository.list_geofences(scope.as_deref())?;
    Ok(Json(ApiResponse::ok(geofences)))
}

/// `POST /api/geofences`
pub async fn create_geofence(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(draft): Json<GeofenceDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Geofence>>), ApiError> {
    user.require(can_manage_vehicles)?;
    let state = state.read().await;
    ApiError::check(state.validator.validate_geofence(&draft))?;

    let org = user.target_org(draft.organization_id.as_deref());
    let geofence = state.repository.insert_geofence(&org, draft, Utc::now())?;
    info!(geofence = %geofence.id, kind = ?geofence.kind, org = %org, "Geofence created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(geofence).with_message("Geofence created successfully")),
    ))
}

/// `PUT /api/geofences/:id`
pub async fn update_geofence(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<GeofencePatch>,
) -> ApiResult<Geofence> {
    user.require(can_manage_vehicles)?;
    let state = state.read().await;
    let existing = state.repository.get_geofence(&id)?;
    user.ensure_org(&existing.organization_id)?;
    ApiError::check(state.validator.validate_geofence_patch(existing.kind, &patch))?;

    let geofence = state.repository.update_geofence(&id, &patch, Utc::now())?;
    Ok(Json(ApiResponse::ok(geofence).with_message("Geofence updated successfully")))
}

/// `DELETE /api/geofences/:id`
pub async fn delete_geofence(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Geofence> {
    user.require(can_manage_vehicles)?;
    let state = state.read().await;
    let existing = state.repository.get_geofence(&id)?;
    user.ensure_org(&existing.organization_id)?;

    let geofence = state.repository.delete_geofence(&id)?;
    info!(geofence = %geofence.id, "Geofence deleted");
    Ok(Json(ApiResponse::ok(geofence).with_message("Geofence deleted successfully")))
}
