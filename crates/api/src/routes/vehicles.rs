//! Vehicle Routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use fleet_protocol::{ApiResponse, VehicleStatus, WsEvent};
use geofence::TrackingSample;
use serde::{Deserialize, Serialize};
use session_auth::can_manage_vehicles;
use storage::{
    new_id, paginate, Alert, SosIncident, SosStatus, Vehicle, VehicleDraft, VehicleFilter,
    VehiclePatch,
};
use tracing::{info, warn};

use super::default_page;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::{telemetry, SharedState};

/// Query parameters for the vehicle listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    pub organization_id: Option<String>,
    /// Matches plate, make, or model
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// `GET /api/vehicles`
pub async fn list_vehicles(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(params): Query<VehicleQuery>,
) -> ApiResult<Vec<Vehicle>> {
    let filter = VehicleFilter {
        organization_id: user.scope(params.organization_id.as_deref()),
        search: params.search,
    };
    let vehicles = state.read().await.repository.list_vehicles(&filter)?;
    Ok(Json(ApiResponse::paged(paginate(vehicles, params.page, params.limit))))
}

/// `POST /api/vehicles`
pub async fn create_vehicle(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(draft): Json<VehicleDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Vehicle>>), ApiError> {
    user.require(can_manage_vehicles)?;
    let state = state.read().await;
    ApiError::check(state.validator.validate_vehicle(&draft))?;

    let org = user.target_org(draft.organization_id.as_deref());
    let vehicle = state.repository.insert_vehicle(&org, draft, Utc::now())?;
    info!(vehicle = %vehicle.id, plate = %vehicle.license_plate, org = %org, "Vehicle created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(vehicle).with_message("Vehicle created successfully")),
    ))
}

/// `GET /api/vehicles/:id`
pub async fn get_vehicle(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Vehicle> {
    let vehicle = state.read().await.repository.get_vehicle(&id)?;
    user.ensure_org(&vehicle.organization_id)?;
    Ok(Json(ApiResponse::ok(vehicle)))
}

/// Apply a patch to an owned vehicle and push the change to clients
async fn patch_vehicle(
    state: &SharedState,
    user: &AuthUser,
    id: &str,
    patch: VehiclePatch,
) -> Result<Vehicle, ApiError> {
    let state = state.read().await;
    let existing = state.repository.get_vehicle(id)?;
    user.ensure_org(&existing.organization_id)?;

    let vehicle = state.repository.update_vehicle(id, &patch, Utc::now())?;
    state.broadcaster.publish(
        &WsEvent::VehicleStatus(VehicleStatus {
            id: vehicle.id.clone(),
            patch,
        }),
        &vehicle.organization_id,
    );
    Ok(vehicle)
}

/// `PUT /api/vehicles/:id`
pub async fn update_vehicle(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<VehiclePatch>,
) -> ApiResult<Vehicle> {
    user.require(can_manage_vehicles)?;
    let vehicle = patch_vehicle(&state, &user, &id, patch).await?;
    Ok(Json(ApiResponse::ok(vehicle).with_message("Vehicle updated successfully")))
}

/// Time range for history queries (RFC 3339)
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// `GET /api/vehicles/:id/history`
pub async fn get_history(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(range): Query<HistoryQuery>,
) -> ApiResult<Vec<TrackingSample>> {
    let state = state.read().await;
    let vehicle = state.repository.get_vehicle(&id)?;
    user.ensure_org(&vehicle.organization_id)?;

    let samples = state.repository.history(&id, range.start, range.end)?;
    Ok(Json(ApiResponse::ok(samples)))
}

#[derive(Debug, Deserialize)]
pub struct ImmobilizeRequest {
    pub immobilize: bool,
}

/// `POST /api/vehicles/:id/immobilize`
pub async fn immobilize(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<ImmobilizeRequest>,
) -> ApiResult<Vehicle> {
    user.require(can_manage_vehicles)?;
    let vehicle = state.read().await.repository.get_vehicle(&id)?;
    user.ensure_org(&vehicle.organization_id)?;
    if !vehicle.has_immobilizer {
        return Err(ApiError::BadRequest(
            "Vehicle does not have an immobilizer".to_string(),
        ));
    }

    let patch = VehiclePatch {
        immobilized: Some(req.immobilize),
        ..Default::default()
    };
    let vehicle = patch_vehicle(&state, &user, &id, patch).await?;
    warn!(vehicle = %vehicle.id, immobilized = req.immobilize, by = %user.user_id(), "Immobilizer command");

    let message = if req.immobilize {
        "Vehicle immobilized successfully"
    } else {
        "Vehicle mobilized successfully"
    };
    Ok(Json(ApiResponse::ok(vehicle).with_message(message)))
}

#[derive(Debug, Deserialize)]
pub struct FuelControlRequest {
    pub enable: bool,
}

/// `POST /api/vehicles/:id/fuel-control`
pub async fn fuel_control(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<FuelControlRequest>,
) -> ApiResult<Vehicle> {
    user.require(can_manage_vehicles)?;
    let vehicle = state.read().await.repository.get_vehicle(&id)?;
    user.ensure_org(&vehicle.organization_id)?;
    if !vehicle.has_fuel_control {
        return Err(ApiError::BadRequest(
            "Vehicle does not have fuel control".to_string(),
        ));
    }

    let patch = VehiclePatch {
        fuel_cut: Some(!req.enable),
        ..Default::default()
    };
    let vehicle = patch_vehicle(&state, &user, &id, patch).await?;
    warn!(vehicle = %vehicle.id, fuel_enabled = req.enable, by = %user.user_id(), "Fuel control command");

    let message = if req.enable {
        "Fuel supply enabled"
    } else {
        "Fuel supply cut"
    };
    Ok(Json(ApiResponse::ok(vehicle).with_message(message)))
}

/// SOS request. Position falls back to the latest tracking sample.
#[derive(Debug, Default, Deserialize)]
pub struct SosRequest {
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosResponse {
    pub incident: SosIncident,
    pub alert: Alert,
}

/// `POST /api/vehicles/:id/sos`
pub async fn trigger_sos(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<SosRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SosResponse>>), ApiError> {
    let mut state = state.write().await;
    let vehicle = state.repository.get_vehicle(&id)?;
    user.ensure_org(&vehicle.organization_id)?;

    let (latitude, longitude) = match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => state
            .repository
            .latest_sample(&id)?
            .map(|s| (s.latitude, s.longitude))
            .ok_or_else(|| ApiError::BadRequest("Vehicle position unknown".to_string()))?,
    };
    state
        .validator
        .validate_latitude("latitude", latitude)
        .and_then(|_| state.validator.validate_longitude("longitude", longitude))
        .map_err(|e| ApiError::Validation {
            message: "Invalid request data".to_string(),
            errors: vec![(&e).into()],
        })?;

    let now = Utc::now();
    let mut incident = SosIncident {
        id: new_id("sos"),
        organization_id: vehicle.organization_id.clone(),
        vehicle_id: vehicle.id.clone(),
        driver_id: vehicle.driver_id.clone(),
        alert_id: None,
        latitude,
        longitude,
        status: SosStatus::Active,
        description: req.description.filter(|d| !d.trim().is_empty()),
        emergency_services: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let draft = state.alerts.sos(&incident, &vehicle, now);
    let alert = state
        .repository
        .insert_alert(&vehicle.organization_id, draft, now)?;
    incident.alert_id = Some(alert.id.clone());
    let incident = state.repository.insert_incident(incident)?;
    telemetry::alert_raised(alert.kind.as_str());

    state
        .broadcaster
        .publish(&WsEvent::SosIncident(incident.clone()), &vehicle.organization_id);
    state
        .broadcaster
        .publish(&WsEvent::AlertNew(alert.clone()), &vehicle.organization_id);
    warn!(vehicle = %vehicle.id, incident = %incident.id, "SOS raised");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SosResponse { incident, alert }).with_message("SOS alert sent")),
    ))
}
