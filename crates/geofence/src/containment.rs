//! Containment sets and transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::status::DriverStatus;
use crate::types::{Geofence, TrackingSample};

/// Active geofences containing the point, in input order.
pub fn containing<'a>(geofences: &'a [Geofence], latitude: f64, longitude: f64) -> Vec<&'a Geofence> {
    geofences
        .iter()
        .filter(|g| g.is_active && g.contains(latitude, longitude))
        .collect()
}

/// Whether any active geofence contains the point
pub fn in_any_geofence(geofences: &[Geofence], latitude: f64, longitude: f64) -> bool {
    geofences
        .iter()
        .any(|g| g.is_active && g.contains(latitude, longitude))
}

/// Derived view of one tracking sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub vehicle_id: String,
    pub driver_status: DriverStatus,
    pub geofence_ids: Vec<String>,
}

impl Evaluation {
    pub fn is_in_geofence(&self) -> bool {
        !self.geofence_ids.is_empty()
    }
}

/// Evaluate a sample against the geofence set at time `now`
pub fn evaluate(sample: &TrackingSample, geofences: &[Geofence], now: DateTime<Utc>) -> Evaluation {
    let geofence_ids: Vec<String> = containing(geofences, sample.latitude, sample.longitude)
        .into_iter()
        .map(|g| g.id.clone())
        .collect();
    let driver_status = DriverStatus::classify(sample.timestamp, sample.speed, now);

    trace!(
        vehicle = %sample.vehicle_id,
        status = driver_status.as_str(),
        fences = geofence_ids.len(),
        "sample evaluated"
    );

    Evaluation {
        vehicle_id: sample.vehicle_id.clone(),
        driver_status,
        geofence_ids,
    }
}

/// Geofence membership changes between two samples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transitions {
    pub entered: Vec<String>,
    pub exited: Vec<String>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Compare two containment sets by geofence id
pub fn transitions(previous: &[String], current: &[String]) -> Transitions {
    Transitions {
        entered: current
            .iter()
            .filter(|id| !previous.contains(id))
            .cloned()
            .collect(),
        exited: previous
            .iter()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect(),
    }
}
