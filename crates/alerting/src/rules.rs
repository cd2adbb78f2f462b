//! Alert rules
//!
//! Each rule looks at the new sample, optionally the previous sample of the
//! same vehicle, and the organization's geofences, and yields alert drafts.

use geofence::{containing, transitions, Geofence, TrackingSample, IDLE_SPEED_KMH};
use storage::{AlertDraft, AlertType, Severity, SosIncident, Vehicle};

use crate::manager::AlertConfig;

/// Inputs shared by every rule
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub vehicle: &'a Vehicle,
    /// Previous sample of the same vehicle, if any
    pub previous: Option<&'a TrackingSample>,
    pub geofences: &'a [Geofence],
}

struct DraftBuilder<'a> {
    vehicle: &'a Vehicle,
    sample: &'a TrackingSample,
}

impl DraftBuilder<'_> {
    fn build(
        &self,
        kind: AlertType,
        severity: Severity,
        title: &str,
        message: String,
        geofence_id: Option<&str>,
    ) -> AlertDraft {
        AlertDraft {
            organization_id: Some(self.vehicle.organization_id.clone()),
            vehicle_id: self.vehicle.id.clone(),
            kind,
            severity: Some(severity),
            title: title.to_string(),
            message,
            latitude: self.sample.latitude,
            longitude: self.sample.longitude,
            speed: Some(self.sample.speed),
            geofence_id: geofence_id.map(str::to_string),
        }
    }
}

/// Severity grows with the excess over the limit: < 10 km/h medium, < 30 high
fn speeding_severity(excess: f64) -> Severity {
    if excess < 10.0 {
        Severity::Medium
    } else if excess < 30.0 {
        Severity::High
    } else {
        Severity::Critical
    }
}

fn speeding(b: &DraftBuilder<'_>) -> Option<AlertDraft> {
    let limit = b.vehicle.max_speed;
    let speed = b.sample.speed;
    if speed <= limit {
        return None;
    }
    Some(b.build(
        AlertType::Speeding,
        speeding_severity(speed - limit),
        "Speed Limit Exceeded",
        format!(
            "Vehicle {} exceeded speed limit ({:.0} km/h in {:.0} km/h zone)",
            b.vehicle.license_plate, speed, limit
        ),
        None,
    ))
}

fn geofence_transitions(
    b: &DraftBuilder<'_>,
    previous: &TrackingSample,
    geofences: &[Geofence],
) -> Vec<AlertDraft> {
    let ids = |lat: f64, lon: f64| -> Vec<String> {
        containing(geofences, lat, lon)
            .into_iter()
            .map(|g| g.id.clone())
            .collect()
    };
    let before = ids(previous.latitude, previous.longitude);
    let after = ids(b.sample.latitude, b.sample.longitude);
    let changes = transitions(&before, &after);

    let by_id = |id: &String| geofences.iter().find(|g| &g.id == id);
    let plate = &b.vehicle.license_plate;
    let mut drafts = Vec::new();

    for geofence in changes.entered.iter().filter_map(by_id) {
        if geofence.alert_on_entry {
            drafts.push(b.build(
                AlertType::GeofenceEntry,
                Severity::Medium,
                "Geofence Entry",
                format!("Vehicle {} entered geofence {}", plate, geofence.name),
                Some(&geofence.id),
            ));
        }
    }
    for geofence in changes.exited.iter().filter_map(by_id) {
        if geofence.alert_on_exit {
            drafts.push(b.build(
                AlertType::GeofenceExit,
                Severity::Medium,
                "Geofence Exit",
                format!("Vehicle {} exited geofence {}", plate, geofence.name),
                Some(&geofence.id),
            ));
        }
    }
    drafts
}

fn unauthorized_movement(b: &DraftBuilder<'_>, geofences: &[Geofence]) -> Vec<AlertDraft> {
    if b.sample.speed < IDLE_SPEED_KMH {
        return Vec::new();
    }
    let at = b.sample.timestamp.naive_utc();
    containing(geofences, b.sample.latitude, b.sample.longitude)
        .into_iter()
        .filter(|g| g.has_schedule() && !g.allows(at))
        .map(|g| {
            b.build(
                AlertType::UnauthorizedMovement,
                Severity::High,
                "Unauthorized Movement",
                format!(
                    "Vehicle {} moving in {} outside allowed hours",
                    b.vehicle.license_plate, g.name
                ),
                Some(&g.id),
            )
        })
        .collect()
}

fn engine_state(b: &DraftBuilder<'_>, previous: &TrackingSample) -> Option<AlertDraft> {
    let plate = &b.vehicle.license_plate;
    match (previous.is_engine_on, b.sample.is_engine_on) {
        (false, true) => Some(b.build(
            AlertType::EngineOn,
            Severity::Low,
            "Engine Started",
            format!("Vehicle {} engine turned on", plate),
            None,
        )),
        (true, false) => Some(b.build(
            AlertType::EngineOff,
            Severity::Low,
            "Engine Stopped",
            format!("Vehicle {} engine turned off", plate),
            None,
        )),
        _ => None,
    }
}

fn fuel_theft(
    b: &DraftBuilder<'_>,
    previous: &TrackingSample,
    threshold: f64,
) -> Option<AlertDraft> {
    let drop = previous.fuel_level - b.sample.fuel_level;
    if drop < threshold || b.sample.speed >= IDLE_SPEED_KMH {
        return None;
    }
    Some(b.build(
        AlertType::FuelTheft,
        Severity::Critical,
        "Possible Fuel Theft",
        format!(
            "Fuel level of vehicle {} dropped from {:.0}% to {:.0}% while stationary",
            b.vehicle.license_plate, previous.fuel_level, b.sample.fuel_level
        ),
        None,
    ))
}

fn low_battery(b: &DraftBuilder<'_>, threshold: f64) -> Option<AlertDraft> {
    let voltage = b.sample.battery_voltage?;
    if voltage >= threshold {
        return None;
    }
    Some(b.build(
        AlertType::LowBattery,
        Severity::Medium,
        "Low Battery",
        format!(
            "Vehicle {} battery at {:.1} V",
            b.vehicle.license_plate, voltage
        ),
        None,
    ))
}

/// Run every rule against a new sample
pub fn evaluate_rules(
    config: &AlertConfig,
    sample: &TrackingSample,
    ctx: &RuleContext<'_>,
) -> Vec<AlertDraft> {
    let b = DraftBuilder {
        vehicle: ctx.vehicle,
        sample,
    };

    let mut drafts: Vec<AlertDraft> = speeding(&b).into_iter().collect();
    drafts.extend(unauthorized_movement(&b, ctx.geofences));
    if let Some(previous) = ctx.previous {
        drafts.extend(geofence_transitions(&b, previous, ctx.geofences));
        drafts.extend(engine_state(&b, previous));
        drafts.extend(fuel_theft(&b, previous, config.fuel_drop_threshold));
    }
    drafts.extend(low_battery(&b, config.low_battery_voltage));
    drafts
}

/// Critical panic button alert for an SOS incident
pub fn sos_alert(incident: &SosIncident, vehicle: &Vehicle) -> AlertDraft {
    let message = match &incident.description {
        Some(description) if !description.is_empty() => format!(
            "Emergency signal from vehicle {}: {}",
            vehicle.license_plate, description
        ),
        _ => format!("Emergency signal from vehicle {}", vehicle.license_plate),
    };
    AlertDraft {
        organization_id: Some(incident.organization_id.clone()),
        vehicle_id: incident.vehicle_id.clone(),
        kind: AlertType::PanicButton,
        severity: Some(Severity::Critical),
        title: "SOS Alert".to_string(),
        message,
        latitude: incident.latitude,
        longitude: incident.longitude,
        speed: None,
        geofence_id: None,
    }
}
