//! Fleet reducer

use chrono::{DateTime, Utc};
use fleet_protocol::{VehicleStatus, WsEvent, WsMessage};
use geofence::{DriverStatus, Geofence, TrackingSample};
use std::collections::HashMap;
use storage::{Alert, AlertType, Severity, SosIncident, Vehicle};
use tracing::{debug, warn};

use crate::live::LiveVehicleData;
use crate::stats::DashboardStats;
use crate::store::Reducer;

/// Default polling interval for `request_tracking_update` (seconds)
pub const DEFAULT_TRACKING_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct FleetState {
    pub vehicles: Vec<Vehicle>,
    /// Latest sample per vehicle id
    pub live_tracking: HashMap<String, TrackingSample>,
    /// Newest first
    pub alerts: Vec<Alert>,
    pub geofences: Vec<Geofence>,
    /// Live view per vehicle id
    pub live_data: HashMap<String, LiveVehicleData>,
    pub is_connected: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub selected_vehicle_id: Option<String>,
    pub tracking_interval_secs: u64,
}

impl Default for FleetState {
    fn default() -> Self {
        Self {
            vehicles: Vec::new(),
            live_tracking: HashMap::new(),
            alerts: Vec::new(),
            geofences: Vec::new(),
            live_data: HashMap::new(),
            is_connected: false,
            is_loading: false,
            error: None,
            selected_vehicle_id: None,
            tracking_interval_secs: DEFAULT_TRACKING_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FleetAction {
    SetLoading(bool),
    SetError(String),
    ClearError,
    SetVehicles(Vec<Vehicle>),
    /// Merge a partial update into a known vehicle
    UpdateVehicle(VehicleStatus),
    /// Replace a vehicle by id, appending when unknown
    UpsertVehicle(Vehicle),
    SetTrackingData(Vec<TrackingSample>),
    UpdateTracking(TrackingSample),
    SetAlerts(Vec<Alert>),
    AddAlert(Alert),
    UpdateAlert(Alert),
    SetGeofences(Vec<Geofence>),
    UpsertGeofence(Geofence),
    RemoveGeofence(String),
    SetLiveData(Vec<LiveVehicleData>),
    UpdateLiveData(LiveVehicleData),
    SetConnectionStatus(bool),
    SelectVehicle(Option<String>),
    SetTrackingInterval(u64),
}

fn upsert_by<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

impl FleetState {
    pub fn reduce(mut self, action: FleetAction) -> Self {
        match action {
            FleetAction::SetLoading(is_loading) => self.is_loading = is_loading,
            FleetAction::SetError(message) => {
                self.error = Some(message);
                self.is_loading = false;
            }
            FleetAction::ClearError => self.error = None,
            FleetAction::SetVehicles(vehicles) => {
                self.vehicles = vehicles;
                self.is_loading = false;
            }
            FleetAction::UpdateVehicle(status) => {
                if let Some(vehicle) = self.vehicles.iter_mut().find(|v| v.id == status.id) {
                    vehicle.apply(&status.patch);
                }
            }
            FleetAction::UpsertVehicle(vehicle) => {
                upsert_by(&mut self.vehicles, vehicle, |a, b| a.id == b.id)
            }
            FleetAction::SetTrackingData(samples) => {
                self.live_tracking = samples
                    .into_iter()
                    .map(|s| (s.vehicle_id.clone(), s))
                    .collect();
            }
            FleetAction::UpdateTracking(sample) => {
                self.live_tracking.insert(sample.vehicle_id.clone(), sample);
            }
            FleetAction::SetAlerts(alerts) => self.alerts = alerts,
            FleetAction::AddAlert(alert) => {
                self.alerts.retain(|a| a.id != alert.id);
                self.alerts.insert(0, alert);
            }
            FleetAction::UpdateAlert(alert) => {
                if let Some(existing) = self.alerts.iter_mut().find(|a| a.id == alert.id) {
                    *existing = alert;
                }
            }
            FleetAction::SetGeofences(geofences) => self.geofences = geofences,
            FleetAction::UpsertGeofence(geofence) => {
                upsert_by(&mut self.geofences, geofence, |a, b| a.id == b.id)
            }
            FleetAction::RemoveGeofence(id) => self.geofences.retain(|g| g.id != id),
            FleetAction::SetLiveData(data) => {
                self.live_data = data
                    .into_iter()
                    .map(|d| (d.vehicle.id.clone(), d))
                    .collect();
            }
            FleetAction::UpdateLiveData(data) => {
                self.live_data.insert(data.vehicle.id.clone(), data);
            }
            FleetAction::SetConnectionStatus(connected) => self.is_connected = connected,
            FleetAction::SelectVehicle(id) => self.selected_vehicle_id = id,
            FleetAction::SetTrackingInterval(secs) => self.tracking_interval_secs = secs,
        }
        self
    }

    /// Apply a server frame. Undecodable frames are logged and ignored.
    pub fn apply_message(self, message: &WsMessage, now: DateTime<Utc>) -> Self {
        let event = match message.decode() {
            Ok(event) => event,
            Err(e) => {
                warn!(kind = ?message.kind, error = %e, "Dropping undecodable message");
                return self;
            }
        };
        debug!(kind = ?message.kind, vehicle = event.vehicle_id(), "Applying message");

        match event {
            WsEvent::TrackingUpdate(sample) => {
                let live = self
                    .vehicles
                    .iter()
                    .find(|v| v.id == sample.vehicle_id)
                    .map(|v| LiveVehicleData::derive(v, &sample, &self.alerts, &self.geofences, now));
                let next = self.reduce(FleetAction::UpdateTracking(sample));
                match live {
                    Some(live) => next.reduce(FleetAction::UpdateLiveData(live)),
                    None => next,
                }
            }
            WsEvent::AlertNew(alert) => self.reduce(FleetAction::AddAlert(alert)),
            WsEvent::AlertUpdate(alert) => self.reduce(FleetAction::UpdateAlert(alert)),
            WsEvent::VehicleStatus(status) => self.reduce(FleetAction::UpdateVehicle(status)),
            WsEvent::SosIncident(incident) => {
                let alert = sos_alert(&incident, &message.organization_id, now);
                // The stored alert may already have arrived as alert_new
                if self.alerts.iter().any(|a| a.id == alert.id) {
                    return self;
                }
                self.reduce(FleetAction::AddAlert(alert))
            }
        }
    }

    pub fn selected_vehicle(&self) -> Option<&Vehicle> {
        let id = self.selected_vehicle_id.as_ref()?;
        self.vehicles.iter().find(|v| &v.id == id)
    }

    /// Status of a vehicle; vehicles without live data are offline
    pub fn driver_status(&self, vehicle_id: &str) -> DriverStatus {
        self.live_data
            .get(vehicle_id)
            .map_or(DriverStatus::Offline, |d| d.driver_status)
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::compute(&self.vehicles, self.live_data.values(), &self.alerts)
    }

    /// Vehicles matching a plate/make/model search and an optional status
    pub fn filter_vehicles(&self, search: &str, status: Option<DriverStatus>) -> Vec<&Vehicle> {
        let term = search.trim().to_lowercase();
        self.vehicles
            .iter()
            .filter(|v| {
                term.is_empty()
                    || v.license_plate.to_lowercase().contains(&term)
                    || v.make.to_lowercase().contains(&term)
                    || v.model.to_lowercase().contains(&term)
            })
            .filter(|v| status.map_or(true, |s| self.driver_status(&v.id) == s))
            .collect()
    }
}

impl Reducer for FleetState {
    type Action = FleetAction;

    fn reduce(self, action: FleetAction) -> Self {
        FleetState::reduce(self, action)
    }
}

/// Critical alert shown for an SOS incident. It takes the id of the stored
/// panic alert when the incident carries one, so `alert_new` replaces it.
fn sos_alert(incident: &SosIncident, organization_id: &str, now: DateTime<Utc>) -> Alert {
    Alert {
        id: incident
            .alert_id
            .clone()
            .unwrap_or_else(|| format!("sos_{}", incident.id)),
        organization_id: organization_id.to_string(),
        vehicle_id: incident.vehicle_id.clone(),
        kind: AlertType::PanicButton,
        severity: Severity::Critical,
        title: "SOS Alert".to_string(),
        message: format!("Emergency signal from vehicle {}", incident.vehicle_id),
        latitude: incident.latitude,
        longitude: incident.longitude,
        speed: None,
        geofence_id: None,
        is_read: false,
        is_resolved: false,
        acknowledged_by: None,
        acknowledged_at: None,
        resolved_by: None,
        resolved_at: None,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{alert, depot, sample, vehicle};
    use chrono::Duration;
    use storage::{SosStatus, VehiclePatch};

    fn fleet() -> FleetState {
        FleetState::default()
            .reduce(FleetAction::SetLoading(true))
            .reduce(FleetAction::SetVehicles(vec![
                vehicle("v1", "RYD-001", "Toyota", "Hilux"),
                vehicle("v2", "DXB-777", "Nissan", "Patrol"),
            ]))
            .reduce(FleetAction::SetGeofences(vec![depot("depot", true)]))
    }

    #[test]
    fn test_defaults() {
        let state = FleetState::default();
        assert_eq!(state.tracking_interval_secs, 30);
        assert!(!state.is_connected);
    }

    #[test]
    fn test_set_vehicles_clears_loading() {
        let state = fleet();
        assert!(!state.is_loading);
        assert_eq!(state.vehicles.len(), 2);
    }

    #[test]
    fn test_error_lifecycle() {
        let state = FleetState::default()
            .reduce(FleetAction::SetLoading(true))
            .reduce(FleetAction::SetError("Failed to load vehicles".to_string()));
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("Failed to load vehicles"));
        assert!(state.reduce(FleetAction::ClearError).error.is_none());
    }

    #[test]
    fn test_update_vehicle_merges_patch() {
        let state = fleet().reduce(FleetAction::UpdateVehicle(VehicleStatus {
            id: "v2".to_string(),
            patch: VehiclePatch {
                immobilized: Some(true),
                ..Default::default()
            },
        }));
        assert!(state.vehicles[1].immobilized);
        assert_eq!(state.vehicles[1].license_plate, "DXB-777");

        // Unknown ids are ignored
        let unchanged = state.clone().reduce(FleetAction::UpdateVehicle(VehicleStatus {
            id: "v9".to_string(),
            patch: VehiclePatch::default(),
        }));
        assert_eq!(unchanged, state);
    }

    #[test]
    fn test_alerts_newest_first() {
        let state = fleet()
            .reduce(FleetAction::AddAlert(alert("a1", "v1", Severity::Low, false)))
            .reduce(FleetAction::AddAlert(alert("a2", "v1", Severity::High, false)));
        let ids: Vec<&str> = state.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);

        let mut resolved = alert("a1", "v1", Severity::Low, true);
        resolved.is_read = true;
        let state = state.reduce(FleetAction::UpdateAlert(resolved));
        assert!(state.alerts[1].is_resolved);
        assert_eq!(state.alerts.len(), 2);
    }

    #[test]
    fn test_geofence_upsert_and_remove() {
        let mut moved = depot("depot", true);
        moved.radius = Some(250.0);
        let state = fleet()
            .reduce(FleetAction::UpsertGeofence(moved))
            .reduce(FleetAction::UpsertGeofence(depot("yard", true)));
        assert_eq!(state.geofences.len(), 2);
        assert_eq!(state.geofences[0].radius, Some(250.0));

        let state = state.reduce(FleetAction::RemoveGeofence("depot".to_string()));
        assert_eq!(state.geofences.len(), 1);
        assert_eq!(state.geofences[0].id, "yard");
    }

    #[test]
    fn test_tracking_message_derives_live_data() {
        let now = Utc::now();
        let state = fleet().reduce(FleetAction::AddAlert(alert("a1", "v1", Severity::High, false)));
        let msg = WsMessage::new(
            &WsEvent::TrackingUpdate(sample("v1", 72.0, 55.0, now - Duration::seconds(10))),
            "org_001",
            now,
        )
        .unwrap();

        let state = state.apply_message(&msg, now);
        assert_eq!(state.live_tracking["v1"].speed, 72.0);
        let live = &state.live_data["v1"];
        assert_eq!(live.driver_status, DriverStatus::Driving);
        assert!(live.is_in_geofence);
        assert_eq!(live.alerts.len(), 1);
    }

    #[test]
    fn test_tracking_for_unknown_vehicle_has_no_live_data() {
        let now = Utc::now();
        let msg = WsMessage::new(
            &WsEvent::TrackingUpdate(sample("ghost", 10.0, 50.0, now)),
            "org_001",
            now,
        )
        .unwrap();
        let state = fleet().apply_message(&msg, now);
        assert!(state.live_tracking.contains_key("ghost"));
        assert!(state.live_data.is_empty());
    }

    #[test]
    fn test_sos_message_adds_critical_alert() {
        let now = Utc::now();
        let incident = SosIncident {
            id: "sos_1".to_string(),
            organization_id: "org_001".to_string(),
            vehicle_id: "v1".to_string(),
            driver_id: None,
            alert_id: None,
            latitude: 24.7,
            longitude: 46.7,
            status: SosStatus::Active,
            description: None,
            emergency_services: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let msg = WsMessage::new(&WsEvent::SosIncident(incident), "org_001", now).unwrap();
        let state = fleet().apply_message(&msg, now);

        let alert = &state.alerts[0];
        assert_eq!(alert.kind, AlertType::PanicButton);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.title, "SOS Alert");
        assert_eq!(alert.message, "Emergency signal from vehicle v1");
    }

    #[test]
    fn test_sos_and_stored_alert_are_one_alert() {
        let now = Utc::now();
        let incident = SosIncident {
            id: "sos_1".to_string(),
            organization_id: "org_001".to_string(),
            vehicle_id: "v1".to_string(),
            driver_id: None,
            alert_id: Some("alert_1".to_string()),
            latitude: 24.7,
            longitude: 46.7,
            status: SosStatus::Active,
            description: None,
            emergency_services: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let mut stored = alert("alert_1", "v1", Severity::Critical, false);
        stored.kind = AlertType::PanicButton;
        stored.message = "Emergency signal from vehicle RYD-001".to_string();

        let sos = WsMessage::new(&WsEvent::SosIncident(incident), "org_001", now).unwrap();
        let new = WsMessage::new(&WsEvent::AlertNew(stored), "org_001", now).unwrap();

        for frames in [[&sos, &new], [&new, &sos]] {
            let state = frames
                .into_iter()
                .fold(fleet(), |state, msg| state.apply_message(msg, now));
            let panic: Vec<&str> = state
                .alerts
                .iter()
                .filter(|a| a.kind == AlertType::PanicButton)
                .map(|a| a.id.as_str())
                .collect();
            assert_eq!(panic, vec!["alert_1"]);
            assert_eq!(state.alerts[0].message, "Emergency signal from vehicle RYD-001");
            assert_eq!(state.stats().critical_alerts, 1);
        }
    }

    #[test]
    fn test_filter_vehicles() {
        let now = Utc::now();
        let msg = WsMessage::new(
            &WsEvent::TrackingUpdate(sample("v1", 0.0, 55.0, now)),
            "org_001",
            now,
        )
        .unwrap();
        let state = fleet().apply_message(&msg, now);

        let plates = |found: Vec<&Vehicle>| -> Vec<String> {
            found.iter().map(|v| v.license_plate.clone()).collect()
        };
        assert_eq!(plates(state.filter_vehicles("patrol", None)), vec!["DXB-777"]);
        assert_eq!(plates(state.filter_vehicles("", Some(DriverStatus::Idle))), vec!["RYD-001"]);
        assert_eq!(plates(state.filter_vehicles("", Some(DriverStatus::Offline))), vec!["DXB-777"]);
        assert_eq!(state.filter_vehicles("", None).len(), 2);
    }

    #[test]
    fn test_stats() {
        let now = Utc::now();
        let msg = WsMessage::new(
            &WsEvent::TrackingUpdate(sample("v1", 50.0, 70.0, now)),
            "org_001",
            now,
        )
        .unwrap();
        let stats = fleet().apply_message(&msg, now).stats();
        assert_eq!(stats.total_vehicles, 2);
        assert_eq!(stats.active_vehicles, 1);
        assert_eq!(stats.avg_speed, 50.0);
    }

    #[test]
    fn test_selection_and_interval() {
        let state = fleet()
            .reduce(FleetAction::SelectVehicle(Some("v2".to_string())))
            .reduce(FleetAction::SetTrackingInterval(10))
            .reduce(FleetAction::SetConnectionStatus(true));
        assert_eq!(state.selected_vehicle().unwrap().license_plate, "DXB-777");
        assert_eq!(state.tracking_interval_secs, 10);
        assert!(state.is_connected);
    }
}
