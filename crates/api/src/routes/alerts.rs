//! Alert Routes

use alerting::AlertKey;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use fleet_protocol::{ApiResponse, WsEvent};
use serde::Deserialize;
use storage::{paginate, Alert, AlertDraft, AlertFilter, Severity};
use tracing::info;

use super::default_page;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::{telemetry, SharedState};

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub organization_id: Option<String>,
    /// Filter by severity
    pub severity: Option<Severity>,
    pub is_read: Option<bool>,
    pub is_resolved: Option<bool>,
    pub vehicle_id: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// `GET /api/alerts`, newest first
pub async fn get_alerts(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(params): Query<AlertQuery>,
) -> ApiResult<Vec<Alert>> {
    let filter = AlertFilter {
        organization_id: user.scope(params.organization_id.as_deref()),
        severity: params.severity,
        is_read: params.is_read,
        is_resolved: params.is_resolved,
        vehicle_id: params.vehicle_id,
    };
    let alerts = state.read().await.repository.list_alerts(&filter)?;
    Ok(Json(ApiResponse::paged(paginate(alerts, params.page, params.limit))))
}

/// `POST /api/alerts`
pub async fn create_alert(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(draft): Json<AlertDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Alert>>), ApiError> {
    let state = state.read().await;
    ApiError::check(state.validator.validate_alert(&draft))?;

    let vehicle = state.repository.get_vehicle(&draft.vehicle_id)?;
    user.ensure_org(&vehicle.organization_id)?;

    let alert = state
        .repository
        .insert_alert(&vehicle.organization_id, draft, Utc::now())?;
    telemetry::alert_raised(alert.kind.as_str());
    state
        .broadcaster
        .publish(&WsEvent::AlertNew(alert.clone()), &alert.organization_id);
    info!(alert = %alert.id, vehicle = %alert.vehicle_id, kind = alert.kind.as_str(), "Alert created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(alert).with_message("Alert created successfully")),
    ))
}

/// `POST /api/alerts/:id/acknowledge`
pub async fn acknowledge_alert(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Alert> {
    let mut state = state.write().await;
    let existing = state.repository.get_alert(&id)?;
    user.ensure_org(&existing.organization_id)?;

    let alert = state
        .repository
        .acknowledge_alert(&id, user.user_id(), Utc::now())?;
    state.alerts.manager_mut().acknowledge(&AlertKey::new(
        &alert.vehicle_id,
        alert.kind,
        alert.geofence_id.as_deref(),
    ));
    state
        .broadcaster
        .publish(&WsEvent::AlertUpdate(alert.clone()), &alert.organization_id);

    Ok(Json(ApiResponse::ok(alert).with_message("Alert acknowledged")))
}

/// `POST /api/alerts/:id/resolve`
pub async fn resolve_alert(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Alert> {
    let state = state.read().await;
    let existing = state.repository.get_alert(&id)?;
    user.ensure_org(&existing.organization_id)?;

    let alert = state
        .repository
        .resolve_alert(&id, user.user_id(), Utc::now())?;
    state
        .broadcaster
        .publish(&WsEvent::AlertUpdate(alert.clone()), &alert.organization_id);
    info!(alert = %alert.id, by = %user.user_id(), "Alert resolved");

    Ok(Json(ApiResponse::ok(alert).with_message("Alert resolved")))
}
