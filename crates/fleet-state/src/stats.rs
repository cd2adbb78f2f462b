//! Dashboard statistics

use geofence::DriverStatus;
use serde::{Deserialize, Serialize};
use storage::{Alert, Severity, Vehicle};

use crate::live::LiveVehicleData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_vehicles: usize,
    /// Vehicles with live data that are not offline
    pub active_vehicles: usize,
    /// Sum of odometer readings (km) over vehicles with live data
    pub total_distance: f64,
    /// Unresolved alerts
    pub total_alerts: usize,
    pub critical_alerts: usize,
    /// Sum of `100 - fuel level` over vehicles with live data
    pub fuel_consumption: f64,
    /// Rounded mean speed over vehicles with live data
    pub avg_speed: f64,
    pub top_speed: f64,
}

impl DashboardStats {
    pub fn compute<'a>(
        vehicles: &[Vehicle],
        live: impl IntoIterator<Item = &'a LiveVehicleData>,
        alerts: &[Alert],
    ) -> Self {
        let live: Vec<&LiveVehicleData> = live.into_iter().collect();
        let speed_sum: f64 = live.iter().map(|l| l.tracking.speed).sum();

        Self {
            total_vehicles: vehicles.len(),
            active_vehicles: live
                .iter()
                .filter(|l| l.driver_status != DriverStatus::Offline)
                .count(),
            total_distance: live.iter().map(|l| l.vehicle.current_km).sum(),
            total_alerts: alerts.iter().filter(|a| !a.is_resolved).count(),
            critical_alerts: alerts
                .iter()
                .filter(|a| a.severity == Severity::Critical && !a.is_resolved)
                .count(),
            fuel_consumption: live.iter().map(|l| 100.0 - l.tracking.fuel_level).sum(),
            avg_speed: (speed_sum / live.len().max(1) as f64).round(),
            top_speed: live
                .iter()
                .map(|l| l.tracking.speed)
                .fold(0.0, f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{alert, sample, vehicle};
    use chrono::{Duration, Utc};

    #[test]
    fn test_empty_fleet() {
        let live: Vec<LiveVehicleData> = Vec::new();
        assert_eq!(DashboardStats::compute(&[], &live, &[]), DashboardStats::default());
    }

    #[test]
    fn test_compute() {
        let now = Utc::now();
        let vehicles = vec![
            vehicle("v1", "A-1", "Toyota", "Hilux"),
            vehicle("v2", "A-2", "Nissan", "Patrol"),
            vehicle("v3", "A-3", "Isuzu", "D-Max"),
        ];
        let live = vec![
            LiveVehicleData::derive(&vehicles[0], &sample("v1", 61.0, 80.0, now), &[], &[], now),
            LiveVehicleData::derive(&vehicles[1], &sample("v2", 0.0, 40.0, now), &[], &[], now),
            LiveVehicleData::derive(
                &vehicles[2],
                &sample("v3", 30.0, 50.0, now - Duration::hours(1)),
                &[],
                &[],
                now,
            ),
        ];
        let alerts = vec![
            alert("a1", "v1", Severity::Critical, false),
            alert("a2", "v1", Severity::Critical, true),
            alert("a3", "v2", Severity::Low, false),
        ];

        let stats = DashboardStats::compute(&vehicles, &live, &alerts);
        assert_eq!(stats.total_vehicles, 3);
        assert_eq!(stats.active_vehicles, 2);
        assert_eq!(stats.total_alerts, 2);
        assert_eq!(stats.critical_alerts, 1);
        assert_eq!(stats.avg_speed, 30.0);
        assert_eq!(stats.top_speed, 61.0);
        assert_eq!(stats.total_distance, 3000.0);
        assert_eq!(stats.fuel_consumption, 130.0);
    }
}
