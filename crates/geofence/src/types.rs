//! Evaluator data types

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::{hhmm, AllowedDay};

/// A geofence vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    /// Position of the vertex within its geofence
    #[serde(default)]
    pub order: u32,
}

impl Coordinate {
    /// Create an unordered coordinate
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            order: 0,
        }
    }
}

/// Geofence shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceKind {
    Circular,
    Polygon,
}

/// Virtual boundary owned by an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: GeofenceKind,
    pub coordinates: Vec<Coordinate>,
    /// Radius in metres, circular geofences only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub is_active: bool,
    #[serde(default)]
    pub alert_on_entry: bool,
    #[serde(default)]
    pub alert_on_exit: bool,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub allowed_time_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub allowed_time_end: Option<NaiveTime>,
    #[serde(default)]
    pub allowed_days: Vec<AllowedDay>,
    #[serde(default)]
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Geofence {
    /// Geometric containment, ignoring the active flag.
    ///
    /// Circular geofences are centred on their first vertex; the boundary is
    /// inclusive. A missing radius counts as zero.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        match self.kind {
            GeofenceKind::Circular => match self.coordinates.first() {
                Some(center) => {
                    let distance = crate::haversine_m(
                        latitude,
                        longitude,
                        center.latitude,
                        center.longitude,
                    );
                    distance <= self.radius.unwrap_or(0.0)
                }
                None => false,
            },
            GeofenceKind::Polygon => {
                crate::point_in_polygon(latitude, longitude, &self.coordinates)
            }
        }
    }

    /// Sort vertices by their `order` field
    pub fn normalize_vertices(&mut self) {
        self.coordinates.sort_by_key(|c| c.order);
    }
}

/// Periodic position report from a vehicle device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSample {
    #[serde(default)]
    pub id: String,
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    /// km/h
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub accuracy: f64,
    pub is_engine_on: bool,
    /// Percent, 0-100
    pub fuel_level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_signal_strength: Option<f64>,
    pub timestamp: DateTime<Utc>,
}
