//! Tracking Routes
//!
//! Ingest evaluates each sample against the organization's geofences and
//! alert rules, then fans the results out over the WebSocket.

use alerting::RuleContext;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use fleet_protocol::{ApiResponse, WsEvent};
use fleet_state::LiveVehicleData;
use geofence::{evaluate, Evaluation, TrackingSample};
use serde::{Deserialize, Serialize};
use storage::{new_id, Alert, AlertFilter, Repository, StorageError, Vehicle, VehicleFilter, VehiclePatch};
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::{telemetry, SharedState};

/// Result of ingesting one sample
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub sample: TrackingSample,
    pub evaluation: Evaluation,
    pub alerts: Vec<Alert>,
}

/// `POST /api/tracking`
pub async fn ingest(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(mut sample): Json<TrackingSample>,
) -> ApiResult<IngestResponse> {
    let mut state = state.write().await;
    ApiError::check(state.validator.validate_sample(&sample))?;

    let vehicle = state.repository.get_vehicle(&sample.vehicle_id)?;
    user.ensure_org(&vehicle.organization_id)?;
    if sample.id.is_empty() {
        sample.id = new_id("track");
    }

    let now = Utc::now();
    let previous = state.repository.record_sample(sample.clone())?;
    telemetry::sample_ingested();

    let geofences = state
        .repository
        .list_geofences(Some(&vehicle.organization_id))?;
    let evaluation = evaluate(&sample, &geofences, now);

    let ctx = RuleContext {
        vehicle: &vehicle,
        previous: previous.as_ref(),
        geofences: &geofences,
    };
    let drafts = state.alerts.process(&sample, &ctx, now);

    let fuel = VehiclePatch {
        current_fuel_level: Some(sample.fuel_level),
        ..Default::default()
    };
    state.repository.update_vehicle(&vehicle.id, &fuel, now)?;

    let org = vehicle.organization_id.as_str();
    state
        .broadcaster
        .publish(&WsEvent::TrackingUpdate(sample.clone()), org);

    let mut alerts = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let alert = state.repository.insert_alert(org, draft, now)?;
        telemetry::alert_raised(alert.kind.as_str());
        info!(
            vehicle = %alert.vehicle_id,
            kind = alert.kind.as_str(),
            severity = alert.severity.as_str(),
            "Alert raised"
        );
        state.broadcaster.publish(&WsEvent::AlertNew(alert.clone()), org);
        alerts.push(alert);
    }

    debug!(
        vehicle = %sample.vehicle_id,
        status = evaluation.driver_status.as_str(),
        fences = evaluation.geofence_ids.len(),
        alerts = alerts.len(),
        "Sample ingested"
    );

    Ok(Json(ApiResponse::ok(IngestResponse {
        sample,
        evaluation,
        alerts,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveQuery {
    pub organization_id: Option<String>,
}

/// Vehicles in scope, live views of those with samples, and open alerts
pub(crate) fn live_snapshot(
    repo: &Repository,
    organization_id: Option<String>,
    now: DateTime<Utc>,
) -> Result<(Vec<Vehicle>, Vec<LiveVehicleData>, Vec<Alert>), StorageError> {
    let vehicles = repo.list_vehicles(&VehicleFilter {
        organization_id: organization_id.clone(),
        search: None,
    })?;
    let geofences = repo.list_geofences(organization_id.as_deref())?;
    let alerts = repo.list_alerts(&AlertFilter {
        organization_id,
        is_resolved: Some(false),
        ..Default::default()
    })?;

    let mut live = Vec::new();
    for vehicle in &vehicles {
        if let Some(sample) = repo.latest_sample(&vehicle.id)? {
            let fences: Vec<_> = geofences
                .iter()
                .filter(|g| g.organization_id == vehicle.organization_id)
                .cloned()
                .collect();
            live.push(LiveVehicleData::derive(vehicle, &sample, &alerts, &fences, now));
        }
    }
    Ok((vehicles, live, alerts))
}

/// `GET /api/tracking/live`
pub async fn live(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(params): Query<LiveQuery>,
) -> ApiResult<Vec<LiveVehicleData>> {
    let scope = user.scope(params.organization_id.as_deref());
    let (_, live, _) = live_snapshot(&state.read().await.repository, scope, Utc::now())?;
    Ok(Json(ApiResponse::ok(live)))
}
