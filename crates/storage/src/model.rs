//! Fleet Records

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use geofence::{hhmm, AllowedDay, Coordinate, Geofence, GeofenceKind};
use serde::{Deserialize, Serialize};

/// Operating region of an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    India,
    SaudiArabia,
    Uae,
    Qatar,
    Kuwait,
    Bahrain,
    Oman,
}

/// Tenant owning vehicles, users, and geofences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub region: Region,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User role, from most to least privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    FleetManager,
    Driver,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::OrgAdmin => "org_admin",
            Role::FleetManager => "fleet_manager",
            Role::Driver => "driver",
            Role::Customer => "customer",
        }
    }
}

/// Dashboard user (credentials are held separately by the repository)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub organization_id: String,
    #[serde(default)]
    pub phone_number: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields a user may change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl User {
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(v) = &patch.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &patch.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = &patch.phone_number {
            self.phone_number = v.clone();
        }
    }
}

/// Fuel type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
}

/// Tracked vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub organization_id: String,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub vin: String,
    pub engine_number: String,
    pub fuel_type: FuelType,
    /// Litres
    pub fuel_capacity: f64,
    /// Percent
    pub current_fuel_level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub device_id: String,
    pub is_active: bool,
    pub has_immobilizer: bool,
    pub has_fuel_control: bool,
    pub has_temperature_monitor: bool,
    #[serde(default)]
    pub immobilized: bool,
    #[serde(default)]
    pub fuel_cut: bool,
    /// km/h
    pub max_speed: f64,
    pub insurance_expiry: NaiveDate,
    pub registration_expiry: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_km: f64,
    pub current_km: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for registering a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDraft {
    #[serde(default)]
    pub organization_id: Option<String>,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub vin: String,
    #[serde(default)]
    pub engine_number: String,
    pub fuel_type: FuelType,
    pub fuel_capacity: f64,
    #[serde(default)]
    pub current_fuel_level: f64,
    #[serde(default)]
    pub driver_id: Option<String>,
    pub device_id: String,
    #[serde(default)]
    pub has_immobilizer: bool,
    #[serde(default)]
    pub has_fuel_control: bool,
    #[serde(default)]
    pub has_temperature_monitor: bool,
    pub max_speed: f64,
    pub insurance_expiry: NaiveDate,
    pub registration_expiry: NaiveDate,
    #[serde(default)]
    pub current_km: f64,
    #[serde(default)]
    pub next_maintenance_km: f64,
}

impl Vehicle {
    /// Build a new active vehicle from a draft
    pub fn from_draft(
        id: String,
        organization_id: String,
        draft: VehicleDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            license_plate: draft.license_plate,
            make: draft.make,
            model: draft.model,
            year: draft.year,
            color: draft.color,
            vin: draft.vin,
            engine_number: draft.engine_number,
            fuel_type: draft.fuel_type,
            fuel_capacity: draft.fuel_capacity,
            current_fuel_level: draft.current_fuel_level,
            driver_id: draft.driver_id,
            device_id: draft.device_id,
            is_active: true,
            has_immobilizer: draft.has_immobilizer,
            has_fuel_control: draft.has_fuel_control,
            has_temperature_monitor: draft.has_temperature_monitor,
            immobilized: false,
            fuel_cut: false,
            max_speed: draft.max_speed,
            insurance_expiry: draft.insurance_expiry,
            registration_expiry: draft.registration_expiry,
            last_maintenance_date: None,
            next_maintenance_km: draft.next_maintenance_km,
            current_km: draft.current_km,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update; returns true when any field changed
    pub fn apply(&mut self, patch: &VehiclePatch) -> bool {
        let before = self.clone();
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &patch.$field { self.$field = v.clone(); })*
            };
        }
        merge!(
            license_plate,
            make,
            model,
            year,
            color,
            fuel_capacity,
            current_fuel_level,
            device_id,
            is_active,
            immobilized,
            fuel_cut,
            max_speed,
            insurance_expiry,
            registration_expiry,
            next_maintenance_km,
            current_km,
        );
        if let Some(driver) = &patch.driver_id {
            self.driver_id = Some(driver.clone());
        }
        if let Some(date) = &patch.last_maintenance_date {
            self.last_maintenance_date = Some(*date);
        }
        *self != before
    }
}

/// Partial vehicle update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_capacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_fuel_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immobilized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_cut: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_expiry: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_expiry: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_maintenance_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_maintenance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_km: Option<f64>,
}

/// Alert category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Speeding,
    GeofenceEntry,
    GeofenceExit,
    EngineOn,
    EngineOff,
    FuelTheft,
    Towing,
    PanicButton,
    MaintenanceDue,
    LowBattery,
    UnauthorizedMovement,
    HarshBraking,
    RapidAcceleration,
    IdleExcess,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Speeding => "speeding",
            AlertType::GeofenceEntry => "geofence_entry",
            AlertType::GeofenceExit => "geofence_exit",
            AlertType::EngineOn => "engine_on",
            AlertType::EngineOff => "engine_off",
            AlertType::FuelTheft => "fuel_theft",
            AlertType::Towing => "towing",
            AlertType::PanicButton => "panic_button",
            AlertType::MaintenanceDue => "maintenance_due",
            AlertType::LowBattery => "low_battery",
            AlertType::UnauthorizedMovement => "unauthorized_movement",
            AlertType::HarshBraking => "harsh_braking",
            AlertType::RapidAcceleration => "rapid_acceleration",
            AlertType::IdleExcess => "idle_excess",
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Alert raised for a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub organization_id: String,
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geofence_id: Option<String>,
    pub is_read: bool,
    pub is_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for raising an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDraft {
    #[serde(default)]
    pub organization_id: Option<String>,
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    #[serde(default)]
    pub severity: Option<Severity>,
    pub title: String,
    pub message: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub geofence_id: Option<String>,
}

impl Alert {
    /// Build an unread, unresolved alert. Severity defaults to medium.
    pub fn from_draft(
        id: String,
        organization_id: String,
        draft: AlertDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            vehicle_id: draft.vehicle_id,
            kind: draft.kind,
            severity: draft.severity.unwrap_or(Severity::Medium),
            title: draft.title,
            message: draft.message,
            latitude: draft.latitude,
            longitude: draft.longitude,
            speed: draft.speed,
            geofence_id: draft.geofence_id,
            is_read: false,
            is_resolved: false,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
        }
    }
}

/// SOS incident lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SosStatus {
    Active,
    Acknowledged,
    Resolved,
    FalseAlarm,
}

/// Panic-button emergency raised from a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosIncident {
    pub id: String,
    pub organization_id: String,
    pub vehicle_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    /// Stored panic alert raised for this incident
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: SosStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub emergency_services: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceDraft {
    #[serde(default)]
    pub organization_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: GeofenceKind,
    pub coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub alert_on_entry: bool,
    #[serde(default)]
    pub alert_on_exit: bool,
    #[serde(default, with = "hhmm")]
    pub allowed_time_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm")]
    pub allowed_time_end: Option<NaiveTime>,
    #[serde(default)]
    pub allowed_days: Vec<AllowedDay>,
    #[serde(default)]
    pub color: String,
}

fn default_true() -> bool {
    true
}

impl GeofenceDraft {
    /// Build a geofence with vertices sorted by their order index
    pub fn into_geofence(self, id: String, organization_id: String, now: DateTime<Utc>) -> Geofence {
        let mut geofence = Geofence {
            id,
            organization_id,
            name: self.name,
            description: self.description,
            kind: self.kind,
            coordinates: self.coordinates,
            radius: self.radius,
            is_active: self.is_active,
            alert_on_entry: self.alert_on_entry,
            alert_on_exit: self.alert_on_exit,
            allowed_time_start: self.allowed_time_start,
            allowed_time_end: self.allowed_time_end,
            allowed_days: self.allowed_days,
            color: self.color,
            created_at: now,
            updated_at: now,
        };
        geofence.normalize_vertices();
        geofence
    }
}

/// Partial geofence update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofencePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub coordinates: Option<Vec<Coordinate>>,
    pub radius: Option<f64>,
    pub is_active: Option<bool>,
    pub alert_on_entry: Option<bool>,
    pub alert_on_exit: Option<bool>,
    #[serde(default, with = "hhmm")]
    pub allowed_time_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm")]
    pub allowed_time_end: Option<NaiveTime>,
    pub allowed_days: Option<Vec<AllowedDay>>,
    pub color: Option<String>,
}

impl GeofencePatch {
    /// Merge into an existing geofence
    pub fn apply_to(&self, geofence: &mut Geofence) {
        if let Some(v) = &self.name {
            geofence.name = v.clone();
        }
        if let Some(v) = &self.description {
            geofence.description = v.clone();
        }
        if let Some(v) = &self.coordinates {
            geofence.coordinates = v.clone();
            geofence.normalize_vertices();
        }
        if self.radius.is_some() {
            geofence.radius = self.radius;
        }
        if let Some(v) = self.is_active {
            geofence.is_active = v;
        }
        if let Some(v) = self.alert_on_entry {
            geofence.alert_on_entry = v;
        }
        if let Some(v) = self.alert_on_exit {
            geofence.alert_on_exit = v;
        }
        if self.allowed_time_start.is_some() {
            geofence.allowed_time_start = self.allowed_time_start;
        }
        if self.allowed_time_end.is_some() {
            geofence.allowed_time_end = self.allowed_time_end;
        }
        if let Some(v) = &self.allowed_days {
            geofence.allowed_days = v.clone();
        }
        if let Some(v) = &self.color {
            geofence.color = v.clone();
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn draft() -> VehicleDraft {
        VehicleDraft {
            organization_id: None,
            license_plate: "RYD-001-2024".to_string(),
            make: "Toyota".to_string(),
            model: "Hilux".to_string(),
            year: 2024,
            color: "White".to_string(),
            vin: "JTMHY7AJ8K4000001".to_string(),
            engine_number: "ENG-001-2024".to_string(),
            fuel_type: FuelType::Diesel,
            fuel_capacity: 80.0,
            current_fuel_level: 75.0,
            driver_id: None,
            device_id: "DEV-001-GPS".to_string(),
            has_immobilizer: true,
            has_fuel_control: true,
            has_temperature_monitor: false,
            max_speed: 120.0,
            insurance_expiry: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            registration_expiry: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            current_km: 15420.0,
            next_maintenance_km: 20000.0,
        }
    }
}
