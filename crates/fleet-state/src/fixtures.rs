use chrono::{DateTime, NaiveDate, Utc};
use fleet_protocol::LoginResponse;
use geofence::{Coordinate, Geofence, GeofenceKind, TrackingSample};
use storage::{
    Alert, AlertType, FuelType, Organization, Region, Role, Severity, User, Vehicle, VehicleDraft,
};

pub fn login_response() -> LoginResponse {
    let now = Utc::now();
    LoginResponse {
        user: User {
            id: "user_001".to_string(),
            email: "manager@fleet.example".to_string(),
            first_name: "Fleet".to_string(),
            last_name: "Manager".to_string(),
            role: Role::FleetManager,
            organization_id: "org_001".to_string(),
            phone_number: String::new(),
            is_active: true,
            last_login: Some(now),
            created_at: now,
            updated_at: now,
        },
        organization: Organization {
            id: "org_001".to_string(),
            name: "Gulf Logistics".to_string(),
            region: Region::SaudiArabia,
            address: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            timezone: "Asia/Riyadh".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        },
        token: "access".to_string(),
        refresh_token: "refresh".to_string(),
    }
}

pub fn vehicle(id: &str, plate: &str, make: &str, model: &str) -> Vehicle {
    let draft = VehicleDraft {
        organization_id: None,
        license_plate: plate.to_string(),
        make: make.to_string(),
        model: model.to_string(),
        year: 2023,
        color: "White".to_string(),
        vin: String::new(),
        engine_number: String::new(),
        fuel_type: FuelType::Diesel,
        fuel_capacity: 80.0,
        current_fuel_level: 60.0,
        driver_id: None,
        device_id: format!("DEV-{}", id),
        has_immobilizer: true,
        has_fuel_control: true,
        has_temperature_monitor: false,
        max_speed: 120.0,
        insurance_expiry: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        registration_expiry: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        current_km: 1000.0,
        next_maintenance_km: 5000.0,
    };
    Vehicle::from_draft(id.to_string(), "org_001".to_string(), draft, Utc::now())
}

pub fn alert(id: &str, vehicle_id: &str, severity: Severity, resolved: bool) -> Alert {
    Alert {
        id: id.to_string(),
        organization_id: "org_001".to_string(),
        vehicle_id: vehicle_id.to_string(),
        kind: AlertType::Speeding,
        severity,
        title: "Speed Limit Exceeded".to_string(),
        message: String::new(),
        latitude: 24.7,
        longitude: 46.7,
        speed: None,
        geofence_id: None,
        is_read: false,
        is_resolved: resolved,
        acknowledged_by: None,
        acknowledged_at: None,
        resolved_by: None,
        resolved_at: None,
        created_at: Utc::now(),
    }
}

pub fn sample(vehicle_id: &str, speed: f64, fuel: f64, timestamp: DateTime<Utc>) -> TrackingSample {
    TrackingSample {
        id: String::new(),
        vehicle_id: vehicle_id.to_string(),
        latitude: 24.7136,
        longitude: 46.6753,
        altitude: 0.0,
        speed,
        heading: 0.0,
        accuracy: 5.0,
        is_engine_on: speed > 0.0,
        fuel_level: fuel,
        temperature: None,
        battery_voltage: None,
        gps_signal_strength: None,
        timestamp,
    }
}

/// 1 km circle around the default sample position
pub fn depot(id: &str, active: bool) -> Geofence {
    let now = Utc::now();
    Geofence {
        id: id.to_string(),
        organization_id: "org_001".to_string(),
        name: id.to_string(),
        description: String::new(),
        kind: GeofenceKind::Circular,
        coordinates: vec![Coordinate::new(24.7136, 46.6753)],
        radius: Some(1000.0),
        is_active: active,
        alert_on_entry: false,
        alert_on_exit: false,
        allowed_time_start: None,
        allowed_time_end: None,
        allowed_days: Vec::new(),
        color: String::new(),
        created_at: now,
        updated_at: now,
    }
}
