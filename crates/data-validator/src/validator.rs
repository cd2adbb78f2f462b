//! Validator for tracking samples and request bodies

use crate::error::{FieldError, ValidationError};
use geofence::{GeofenceKind, TrackingSample};
use serde::{Deserialize, Serialize};
use storage::{AlertDraft, GeofenceDraft, GeofencePatch, VehicleDraft};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reported speed valid range (km/h)
    pub speed_range: (f64, f64),
    /// Heading valid range (degrees)
    pub heading_range: (f64, f64),
    /// Fuel level valid range (%)
    pub fuel_range: (f64, f64),
    /// Geofence radius valid range (m)
    pub radius_range: (f64, f64),
    /// Vehicle model year valid range
    pub year_range: (f64, f64),
    /// Minimum password length at login
    pub min_password_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            speed_range: (0.0, 400.0),
            heading_range: (0.0, 360.0),
            fuel_range: (0.0, 100.0),
            radius_range: (1.0, 100_000.0),
            year_range: (1950.0, 2100.0),
            min_password_len: 6,
        }
    }
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Fold individual checks into one result
    pub fn collect(checks: Vec<Result<(), ValidationError>>) -> Self {
        let fields_checked = checks.len();
        let errors: Vec<ValidationError> = checks.into_iter().filter_map(Result::err).collect();
        Self {
            valid: errors.is_empty(),
            errors,
            fields_checked,
        }
    }

    /// Errors in response form
    pub fn field_errors(&self) -> Vec<FieldError> {
        self.errors.iter().map(FieldError::from).collect()
    }

    /// `Ok` when valid, otherwise the field errors
    pub fn into_result(self) -> Result<(), Vec<FieldError>> {
        if self.valid {
            Ok(())
        } else {
            Err(self.field_errors())
        }
    }
}

/// Data validator
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() || value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    pub fn validate_latitude(&self, field: &'static str, lat: f64) -> Result<(), ValidationError> {
        self.validate_range(field, lat, (-90.0, 90.0))
    }

    pub fn validate_longitude(&self, field: &'static str, lon: f64) -> Result<(), ValidationError> {
        self.validate_range(field, lon, (-180.0, 180.0))
    }

    fn require(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::MissingField(field))
        } else {
            Ok(())
        }
    }

    /// Validate an inbound tracking sample
    pub fn validate_sample(&self, sample: &TrackingSample) -> ValidationResult {
        let result = ValidationResult::collect(vec![
            self.require("vehicleId", &sample.vehicle_id),
            self.validate_latitude("latitude", sample.latitude),
            self.validate_longitude("longitude", sample.longitude),
            self.validate_range("speed", sample.speed, self.config.speed_range),
            self.validate_range("heading", sample.heading, self.config.heading_range),
            self.validate_range("fuelLevel", sample.fuel_level, self.config.fuel_range),
        ]);
        if !result.valid {
            debug!(vehicle = %sample.vehicle_id, errors = result.errors.len(), "Rejected tracking sample");
        }
        result
    }

    /// Validate a geofence draft.
    ///
    /// Circular geofences need a centre and a radius; polygons need at least
    /// three vertices.
    pub fn validate_geofence(&self, draft: &GeofenceDraft) -> ValidationResult {
        let mut checks = vec![self.require("name", &draft.name)];

        match draft.kind {
            GeofenceKind::Circular => {
                checks.push(if draft.coordinates.is_empty() {
                    Err(ValidationError::MissingField("coordinates"))
                } else {
                    Ok(())
                });
                checks.push(match draft.radius {
                    Some(r) => self.validate_range("radius", r, self.config.radius_range),
                    None => Err(ValidationError::MissingField("radius")),
                });
            }
            GeofenceKind::Polygon => {
                checks.push(if draft.coordinates.len() < 3 {
                    Err(ValidationError::InvalidFormat {
                        field: "coordinates",
                        reason: format!(
                            "polygon needs at least 3 vertices, got {}",
                            draft.coordinates.len()
                        ),
                    })
                } else {
                    Ok(())
                });
            }
        }

        for c in &draft.coordinates {
            checks.push(self.validate_latitude("coordinates.latitude", c.latitude));
            checks.push(self.validate_longitude("coordinates.longitude", c.longitude));
        }

        checks.push(
            match (draft.allowed_time_start, draft.allowed_time_end) {
                (Some(_), None) | (None, Some(_)) => Err(ValidationError::InvalidFormat {
                    field: "allowedTimeEnd",
                    reason: "allowed window needs both start and end".to_string(),
                }),
                _ => Ok(()),
            },
        );

        ValidationResult::collect(checks)
    }

    /// Validate a partial geofence update against the stored geofence kind
    pub fn validate_geofence_patch(&self, kind: GeofenceKind, patch: &GeofencePatch) -> ValidationResult {
        let mut checks = Vec::new();
        if let Some(name) = &patch.name {
            checks.push(self.require("name", name));
        }
        if let Some(r) = patch.radius {
            checks.push(self.validate_range("radius", r, self.config.radius_range));
        }
        if let Some(coordinates) = &patch.coordinates {
            let min = match kind {
                GeofenceKind::Circular => 1,
                GeofenceKind::Polygon => 3,
            };
            checks.push(if coordinates.len() < min {
                Err(ValidationError::InvalidFormat {
                    field: "coordinates",
                    reason: format!("expected at least {} vertices, got {}", min, coordinates.len()),
                })
            } else {
                Ok(())
            });
            for c in coordinates {
                checks.push(self.validate_latitude("coordinates.latitude", c.latitude));
                checks.push(self.validate_longitude("coordinates.longitude", c.longitude));
            }
        }
        ValidationResult::collect(checks)
    }

    /// Validate a manually raised alert
    pub fn validate_alert(&self, draft: &AlertDraft) -> ValidationResult {
        let mut checks = vec![
            self.require("vehicleId", &draft.vehicle_id),
            self.require("title", &draft.title),
            self.require("message", &draft.message),
            self.validate_latitude("latitude", draft.latitude),
            self.validate_longitude("longitude", draft.longitude),
        ];
        if let Some(speed) = draft.speed {
            checks.push(self.validate_range("speed", speed, self.config.speed_range));
        }
        ValidationResult::collect(checks)
    }

    /// Validate a vehicle registration
    pub fn validate_vehicle(&self, draft: &VehicleDraft) -> ValidationResult {
        ValidationResult::collect(vec![
            self.require("licensePlate", &draft.license_plate),
            self.require("make", &draft.make),
            self.require("model", &draft.model),
            self.require("deviceId", &draft.device_id),
            self.validate_range("year", draft.year as f64, self.config.year_range),
            self.validate_range("fuelCapacity", draft.fuel_capacity, (0.0, 2_000.0)),
            self.validate_range("currentFuelLevel", draft.current_fuel_level, self.config.fuel_range),
            self.validate_range("maxSpeed", draft.max_speed, (1.0, self.config.speed_range.1)),
        ])
    }

    /// Validate login credentials
    pub fn validate_login(&self, email: &str, password: &str) -> ValidationResult {
        let email_check = if is_email(email) {
            Ok(())
        } else {
            Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "Invalid email".to_string(),
            })
        };
        let password_check = if password.chars().count() >= self.config.min_password_len {
            Ok(())
        } else {
            Err(ValidationError::InvalidFormat {
                field: "password",
                reason: format!(
                    "String must contain at least {} character(s)",
                    self.config.min_password_len
                ),
            })
        };
        ValidationResult::collect(vec![email_check, password_check])
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

/// Minimal address shape check: one `@`, non-empty local part, dotted domain
fn is_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !value.chars().any(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use geofence::Coordinate;
    use proptest::prelude::*;

    fn sample() -> TrackingSample {
        TrackingSample {
            id: String::new(),
            vehicle_id: "vehicle_001".to_string(),
            latitude: 24.7136,
            longitude: 46.6753,
            altitude: 612.0,
            speed: 72.0,
            heading: 180.0,
            accuracy: 4.0,
            is_engine_on: true,
            fuel_level: 75.0,
            temperature: None,
            battery_voltage: Some(12.7),
            gps_signal_strength: Some(0.9),
            timestamp: Utc::now(),
        }
    }

    fn circle_draft() -> GeofenceDraft {
        GeofenceDraft {
            organization_id: None,
            name: "Depot".to_string(),
            description: String::new(),
            kind: GeofenceKind::Circular,
            coordinates: vec![Coordinate::new(24.7, 46.7)],
            radius: Some(300.0),
            is_active: true,
            alert_on_entry: true,
            alert_on_exit: true,
            allowed_time_start: None,
            allowed_time_end: None,
            allowed_days: Vec::new(),
            color: String::new(),
        }
    }

    #[test]
    fn test_valid_sample() {
        let validator = Validator::default();
        assert!(validator.validate_sample(&sample()).valid);
    }

    #[test]
    fn test_invalid_sample_fields() {
        let validator = Validator::default();
        let mut s = sample();
        s.latitude = 91.0;
        s.fuel_level = 140.0;
        s.vehicle_id.clear();

        let result = validator.validate_sample(&s);
        assert!(!result.valid);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["vehicleId", "latitude", "fuelLevel"]);
    }

    #[test]
    fn test_nan_rejected() {
        let validator = Validator::default();
        let mut s = sample();
        s.speed = f64::NAN;
        assert!(!validator.validate_sample(&s).valid);
    }

    #[test]
    fn test_circular_geofence_needs_radius() {
        let validator = Validator::default();
        assert!(validator.validate_geofence(&circle_draft()).valid);

        let mut draft = circle_draft();
        draft.radius = None;
        let errors = validator.validate_geofence(&draft).into_result().unwrap_err();
        assert_eq!(errors[0].field, "radius");
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        let validator = Validator::default();
        let mut draft = circle_draft();
        draft.kind = GeofenceKind::Polygon;
        draft.coordinates.push(Coordinate::new(24.8, 46.7));
        assert!(!validator.validate_geofence(&draft).valid);

        draft.coordinates.push(Coordinate::new(24.8, 46.8));
        assert!(validator.validate_geofence(&draft).valid);
    }

    #[test]
    fn test_half_open_window_rejected() {
        let validator = Validator::default();
        let mut draft = circle_draft();
        draft.allowed_time_start = NaiveTime::from_hms_opt(8, 0, 0);
        assert!(!validator.validate_geofence(&draft).valid);
    }

    #[test]
    fn test_login() {
        let validator = Validator::default();
        assert!(validator.validate_login("fleet@example.com", "fleet123").valid);

        let result = validator.validate_login("not-an-email", "123");
        let errors = result.field_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[1].field, "password");
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("a b@c.co"));
    }

    #[test]
    fn test_geofence_patch_vertex_count() {
        let validator = Validator::default();
        let patch = GeofencePatch {
            coordinates: Some(vec![Coordinate::new(1.0, 1.0), Coordinate::new(1.0, 2.0)]),
            ..Default::default()
        };
        assert!(!validator.validate_geofence_patch(GeofenceKind::Polygon, &patch).valid);
        assert!(validator.validate_geofence_patch(GeofenceKind::Circular, &patch).valid);
        assert!(validator
            .validate_geofence_patch(GeofenceKind::Polygon, &GeofencePatch::default())
            .valid);
    }

    #[test]
    fn test_alert_draft() {
        let validator = Validator::default();
        let mut draft = AlertDraft {
            organization_id: None,
            vehicle_id: "vehicle_001".to_string(),
            kind: storage::AlertType::Towing,
            severity: None,
            title: "Towing".to_string(),
            message: "Vehicle moved with engine off".to_string(),
            latitude: 24.7,
            longitude: 46.6,
            speed: Some(12.0),
            geofence_id: None,
        };
        assert!(validator.validate_alert(&draft).valid);

        draft.latitude = 123.0;
        let errors = validator.validate_alert(&draft).field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "latitude");
    }

    proptest! {
        #[test]
        fn prop_in_range_coordinates_accepted(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let validator = Validator::default();
            let mut s = sample();
            s.latitude = lat;
            s.longitude = lon;
            prop_assert!(validator.validate_sample(&s).valid);
        }
    }
}
