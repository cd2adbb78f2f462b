//! Live vehicle data

use chrono::{DateTime, Utc};
use geofence::{containing, DriverStatus, Geofence, TrackingSample};
use serde::{Deserialize, Serialize};
use storage::{Alert, Vehicle};

/// Latest known view of one vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveVehicleData {
    pub vehicle: Vehicle,
    pub tracking: TrackingSample,
    /// Unresolved alerts of this vehicle
    pub alerts: Vec<Alert>,
    pub is_in_geofence: bool,
    pub current_geofences: Vec<Geofence>,
    pub driver_status: DriverStatus,
    pub last_update: DateTime<Utc>,
}

impl LiveVehicleData {
    /// Derive the live view from a sample and the current fleet collections
    pub fn derive(
        vehicle: &Vehicle,
        tracking: &TrackingSample,
        alerts: &[Alert],
        geofences: &[Geofence],
        now: DateTime<Utc>,
    ) -> Self {
        let current_geofences: Vec<Geofence> =
            containing(geofences, tracking.latitude, tracking.longitude)
                .into_iter()
                .cloned()
                .collect();

        Self {
            vehicle: vehicle.clone(),
            tracking: tracking.clone(),
            alerts: alerts
                .iter()
                .filter(|a| a.vehicle_id == vehicle.id && !a.is_resolved)
                .cloned()
                .collect(),
            is_in_geofence: !current_geofences.is_empty(),
            current_geofences,
            driver_status: DriverStatus::classify(tracking.timestamp, tracking.speed, now),
            last_update: now,
        }
    }
}
