//! REST loads and commands feeding the fleet store
//!
//! Failures are logged and surface as the store's `error` message.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_protocol::VehicleStatus;
use fleet_state::{FleetAction, FleetState, Store};
use geofence::TrackingSample;
use storage::{GeofenceDraft, GeofencePatch, VehiclePatch};
use tracing::warn;

use crate::api::{ApiClient, SosReport, VehicleQuery};
use crate::ClientError;

pub struct Dashboard {
    api: ApiClient,
    fleet: Arc<Store<FleetState>>,
}

impl Dashboard {
    pub fn new(api: ApiClient, fleet: Arc<Store<FleetState>>) -> Self {
        Self { api, fleet }
    }

    pub fn fleet(&self) -> &Arc<Store<FleetState>> {
        &self.fleet
    }

    /// Log `err` and record `message` as the store error
    fn fail(&self, message: &str, err: &ClientError) {
        warn!(error = %err, "{}", message);
        self.fleet.dispatch(FleetAction::SetError(message.to_string()));
    }

    /// Vehicles, alerts, and geofences in parallel
    pub async fn load_initial_data(&self) {
        self.fleet.dispatch(FleetAction::SetLoading(true));
        tokio::join!(self.load_vehicles(), self.load_alerts(), self.load_geofences());
        self.fleet.dispatch(FleetAction::SetLoading(false));
    }

    pub async fn load_vehicles(&self) {
        match self.api.vehicles(&VehicleQuery::default()).await {
            Ok(vehicles) => {
                self.fleet.dispatch(FleetAction::SetVehicles(vehicles));
            }
            Err(err) => self.fail("Failed to load vehicles", &err),
        }
    }

    pub async fn load_alerts(&self) {
        match self.api.alerts().await {
            Ok(alerts) => {
                self.fleet.dispatch(FleetAction::SetAlerts(alerts));
            }
            Err(err) => self.fail("Failed to load alerts", &err),
        }
    }

    pub async fn load_geofences(&self) {
        match self.api.geofences().await {
            Ok(geofences) => {
                self.fleet.dispatch(FleetAction::SetGeofences(geofences));
            }
            Err(err) => self.fail("Failed to load geofences", &err),
        }
    }

    pub async fn update_vehicle(&self, id: &str, patch: VehiclePatch) {
        match self.api.update_vehicle(id, &patch).await {
            Ok(_) => {
                self.fleet.dispatch(FleetAction::UpdateVehicle(VehicleStatus {
                    id: id.to_string(),
                    patch,
                }));
            }
            Err(err) => self.fail("Failed to update vehicle", &err),
        }
    }

    pub async fn control_immobilizer(&self, id: &str, immobilize: bool) {
        match self.api.immobilize(id, immobilize).await {
            Ok(vehicle) => {
                self.fleet.dispatch(FleetAction::UpsertVehicle(vehicle));
            }
            Err(err) => self.fail("Failed to control vehicle immobilizer", &err),
        }
    }

    pub async fn control_fuel(&self, id: &str, enable: bool) {
        match self.api.fuel_control(id, enable).await {
            Ok(vehicle) => {
                self.fleet.dispatch(FleetAction::UpsertVehicle(vehicle));
            }
            Err(err) => self.fail("Failed to control fuel system", &err),
        }
    }

    /// Tracking history of one vehicle. Live tracking is left untouched.
    pub async fn vehicle_history(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<TrackingSample> {
        match self.api.history(id, start, end).await {
            Ok(samples) => samples,
            Err(err) => {
                self.fail("Failed to load vehicle history", &err);
                Vec::new()
            }
        }
    }

    pub async fn acknowledge_alert(&self, id: &str) {
        match self.api.acknowledge_alert(id).await {
            Ok(alert) => {
                self.fleet.dispatch(FleetAction::UpdateAlert(alert));
            }
            Err(err) => self.fail("Failed to acknowledge alert", &err),
        }
    }

    pub async fn resolve_alert(&self, id: &str) {
        match self.api.resolve_alert(id).await {
            Ok(alert) => {
                self.fleet.dispatch(FleetAction::UpdateAlert(alert));
            }
            Err(err) => self.fail("Failed to resolve alert", &err),
        }
    }

    pub async fn create_geofence(&self, draft: &GeofenceDraft) {
        match self.api.create_geofence(draft).await {
            Ok(geofence) => {
                self.fleet.dispatch(FleetAction::UpsertGeofence(geofence));
            }
            Err(err) => self.fail("Failed to create geofence", &err),
        }
    }

    pub async fn update_geofence(&self, id: &str, patch: &GeofencePatch) {
        match self.api.update_geofence(id, patch).await {
            Ok(geofence) => {
                self.fleet.dispatch(FleetAction::UpsertGeofence(geofence));
            }
            Err(err) => self.fail("Failed to update geofence", &err),
        }
    }

    pub async fn delete_geofence(&self, id: &str) {
        match self.api.delete_geofence(id).await {
            Ok(_) => {
                self.fleet.dispatch(FleetAction::RemoveGeofence(id.to_string()));
            }
            Err(err) => self.fail("Failed to delete geofence", &err),
        }
    }

    /// The resulting alert arrives over the live feed
    pub async fn trigger_sos(&self, vehicle_id: &str, description: Option<&str>) -> Option<SosReport> {
        match self.api.trigger_sos(vehicle_id, description).await {
            Ok(report) => Some(report),
            Err(err) => {
                self.fail("Failed to trigger SOS", &err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    fn offline() -> Dashboard {
        let mut api = ApiClient::new(ClientConfig::new("http://127.0.0.1:9"));
        api.set_token(Some("token".to_string()));
        Dashboard::new(api, Arc::new(Store::default()))
    }

    #[tokio::test]
    async fn test_failed_load_sets_error() {
        let dashboard = offline();
        dashboard.load_vehicles().await;
        assert_eq!(
            dashboard.fleet().snapshot().error.as_deref(),
            Some("Failed to load vehicles")
        );
    }

    #[tokio::test]
    async fn test_initial_load_clears_loading() {
        let dashboard = offline();
        dashboard.load_initial_data().await;
        let state = dashboard.fleet().snapshot();
        assert!(!state.is_loading);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_failed_command_sets_error() {
        let dashboard = offline();
        dashboard.control_immobilizer("vehicle_001", true).await;
        assert_eq!(
            dashboard.fleet().snapshot().error.as_deref(),
            Some("Failed to control vehicle immobilizer")
        );
    }

    #[tokio::test]
    async fn test_failed_history_is_empty() {
        let dashboard = offline();
        let end = Utc::now();
        let samples = dashboard
            .vehicle_history("vehicle_001", end - chrono::Duration::hours(1), end)
            .await;
        assert!(samples.is_empty());
        assert_eq!(
            dashboard.fleet().snapshot().error.as_deref(),
            Some("Failed to load vehicle history")
        );

        dashboard.control_fuel("vehicle_001", false).await;
        assert_eq!(
            dashboard.fleet().snapshot().error.as_deref(),
            Some("Failed to control fuel system")
        );
    }

    #[tokio::test]
    async fn test_failed_geofence_and_sos_commands_set_error() {
        let dashboard = offline();

        dashboard.update_geofence("geo_1", &GeofencePatch::default()).await;
        assert_eq!(
            dashboard.fleet().snapshot().error.as_deref(),
            Some("Failed to update geofence")
        );

        dashboard.delete_geofence("geo_1").await;
        assert_eq!(
            dashboard.fleet().snapshot().error.as_deref(),
            Some("Failed to delete geofence")
        );

        assert!(dashboard.trigger_sos("vehicle_001", Some("Accident")).await.is_none());
        assert_eq!(
            dashboard.fleet().snapshot().error.as_deref(),
            Some("Failed to trigger SOS")
        );
    }

    fn sample(vehicle_id: &str, speed: f64) -> TrackingSample {
        TrackingSample {
            id: format!("track_{vehicle_id}"),
            vehicle_id: vehicle_id.to_string(),
            latitude: 24.7136,
            longitude: 46.6753,
            altitude: 0.0,
            speed,
            heading: 90.0,
            accuracy: 5.0,
            is_engine_on: true,
            fuel_level: 64.0,
            temperature: None,
            battery_voltage: None,
            gps_signal_strength: None,
            timestamp: Utc::now(),
        }
    }

    /// Server answering every history request with one old sample
    async fn serve_history() -> String {
        let app = Router::new().route(
            "/api/vehicles/:id/history",
            get(|Path(id): Path<String>| async move {
                Json(json!({"success": true, "data": [sample(&id, 10.0)]}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_history_keeps_live_tracking() {
        let mut api = ApiClient::new(ClientConfig::new(serve_history().await));
        api.set_token(Some("token".to_string()));
        let fleet = Arc::new(Store::<FleetState>::default());
        fleet.dispatch(FleetAction::UpdateTracking(sample("v1", 55.0)));
        fleet.dispatch(FleetAction::UpdateTracking(sample("v2", 70.0)));
        let dashboard = Dashboard::new(api, fleet);

        let end = Utc::now();
        let history = dashboard
            .vehicle_history("v1", end - chrono::Duration::hours(1), end)
            .await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].speed, 10.0);

        let state = dashboard.fleet().snapshot();
        assert_eq!(state.live_tracking.len(), 2);
        assert_eq!(state.live_tracking["v1"].speed, 55.0);
        assert_eq!(state.live_tracking["v2"].speed, 70.0);
        assert!(state.error.is_none());
    }
}
