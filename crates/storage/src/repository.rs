//! Repository Implementation

use crate::model::{
    Alert, AlertDraft, GeofenceDraft, GeofencePatch, Organization, SosIncident, User, Vehicle,
    VehicleDraft, VehiclePatch,
};
use crate::query::{AlertFilter, VehicleFilter};
use crate::{new_id, StorageError};
use chrono::{DateTime, Utc};
use geofence::{Geofence, TrackingSample};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Default tracking history kept per vehicle
pub const DEFAULT_MAX_SAMPLES_PER_VEHICLE: usize = 10_000;

/// User together with its stored password digest
#[derive(Debug, Clone)]
struct Account {
    user: User,
    password_digest: String,
}

/// Repository for data access (in-memory)
pub struct Repository {
    organizations: Mutex<Vec<Organization>>,
    accounts: Mutex<Vec<Account>>,
    vehicles: Mutex<Vec<Vehicle>>,
    alerts: Mutex<Vec<Alert>>,
    geofences: Mutex<Vec<Geofence>>,
    /// Tracking history per vehicle, oldest first
    tracking: Mutex<HashMap<String, VecDeque<TrackingSample>>>,
    incidents: Mutex<Vec<SosIncident>>,
    max_samples_per_vehicle: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Lock(e.to_string()))
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_MAX_SAMPLES_PER_VEHICLE)
    }

    /// Create a repository keeping at most `max_samples_per_vehicle` samples per vehicle
    pub fn with_retention(max_samples_per_vehicle: usize) -> Self {
        info!(max_samples_per_vehicle, "Creating in-memory repository");
        Self {
            organizations: Mutex::new(Vec::new()),
            accounts: Mutex::new(Vec::new()),
            vehicles: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            geofences: Mutex::new(Vec::new()),
            tracking: Mutex::new(HashMap::new()),
            incidents: Mutex::new(Vec::new()),
            max_samples_per_vehicle: max_samples_per_vehicle.max(1),
        }
    }

    // --- organizations -----------------------------------------------------

    /// Insert or replace an organization
    pub fn upsert_organization(&self, org: Organization) -> Result<(), StorageError> {
        let mut orgs = lock(&self.organizations)?;
        match orgs.iter_mut().find(|o| o.id == org.id) {
            Some(existing) => *existing = org,
            None => orgs.push(org),
        }
        Ok(())
    }

    pub fn get_organization(&self, id: &str) -> Result<Organization, StorageError> {
        lock(&self.organizations)?
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("organization", id))
    }

    // --- accounts ----------------------------------------------------------

    /// Register a user with an opaque password digest. E-mails are unique,
    /// compared case-insensitively.
    pub fn insert_account(&self, user: User, password_digest: String) -> Result<(), StorageError> {
        let mut accounts = lock(&self.accounts)?;
        if accounts
            .iter()
            .any(|a| a.user.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StorageError::Conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        debug!(user = %user.id, role = user.role.as_str(), "Inserted account");
        accounts.push(Account {
            user,
            password_digest,
        });
        Ok(())
    }

    /// Find a user and its password digest by e-mail
    pub fn find_account(&self, email: &str) -> Result<Option<(User, String)>, StorageError> {
        Ok(lock(&self.accounts)?
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email))
            .map(|a| (a.user.clone(), a.password_digest.clone())))
    }

    pub fn get_user(&self, id: &str) -> Result<User, StorageError> {
        lock(&self.accounts)?
            .iter()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
            .ok_or_else(|| StorageError::not_found("user", id))
    }

    /// Stamp a successful login
    pub fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<User, StorageError> {
        let mut accounts = lock(&self.accounts)?;
        let account = accounts
            .iter_mut()
            .find(|a| a.user.id == user_id)
            .ok_or_else(|| StorageError::not_found("user", user_id))?;
        account.user.last_login = Some(at);
        Ok(account.user.clone())
    }

    // --- vehicles ----------------------------------------------------------

    pub fn insert_vehicle(
        &self,
        organization_id: &str,
        draft: VehicleDraft,
        now: DateTime<Utc>,
    ) -> Result<Vehicle, StorageError> {
        let mut vehicles = lock(&self.vehicles)?;
        if vehicles
            .iter()
            .any(|v| v.license_plate.eq_ignore_ascii_case(&draft.license_plate))
        {
            return Err(StorageError::Conflict(format!(
                "vehicle with plate {} already exists",
                draft.license_plate
            )));
        }
        let vehicle = Vehicle::from_draft(new_id("vehicle"), organization_id.to_string(), draft, now);
        vehicles.push(vehicle.clone());
        debug!(vehicle = %vehicle.id, plate = %vehicle.license_plate, "Inserted vehicle");
        Ok(vehicle)
    }

    pub fn get_vehicle(&self, id: &str) -> Result<Vehicle, StorageError> {
        lock(&self.vehicles)?
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("vehicle", id))
    }

    pub fn update_vehicle(
        &self,
        id: &str,
        patch: &VehiclePatch,
        now: DateTime<Utc>,
    ) -> Result<Vehicle, StorageError> {
        let mut vehicles = lock(&self.vehicles)?;
        let vehicle = vehicles
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| StorageError::not_found("vehicle", id))?;
        if vehicle.apply(patch) {
            vehicle.updated_at = now;
        }
        Ok(vehicle.clone())
    }

    /// Vehicles in insertion order
    pub fn list_vehicles(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>, StorageError> {
        Ok(lock(&self.vehicles)?
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.lock().map(|v| v.len()).unwrap_or(0)
    }

    // --- alerts ------------------------------------------------------------

    pub fn insert_alert(
        &self,
        organization_id: &str,
        draft: AlertDraft,
        now: DateTime<Utc>,
    ) -> Result<Alert, StorageError> {
        let alert = Alert::from_draft(new_id("alert"), organization_id.to_string(), draft, now);
        lock(&self.alerts)?.push(alert.clone());
        debug!(alert = %alert.id, kind = alert.kind.as_str(), "Inserted alert");
        Ok(alert)
    }

    pub fn get_alert(&self, id: &str) -> Result<Alert, StorageError> {
        lock(&self.alerts)?
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("alert", id))
    }

    /// Mark an alert read and acknowledged. Re-acknowledging keeps the first stamp.
    pub fn acknowledge_alert(
        &self,
        id: &str,
        by: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StorageError> {
        let mut alerts = lock(&self.alerts)?;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::not_found("alert", id))?;
        alert.is_read = true;
        if alert.acknowledged_at.is_none() {
            alert.acknowledged_by = Some(by.to_string());
            alert.acknowledged_at = Some(at);
        }
        Ok(alert.clone())
    }

    /// Resolve an alert; resolving also acknowledges it
    pub fn resolve_alert(
        &self,
        id: &str,
        by: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StorageError> {
        let mut alerts = lock(&self.alerts)?;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::not_found("alert", id))?;
        alert.is_read = true;
        if alert.acknowledged_at.is_none() {
            alert.acknowledged_by = Some(by.to_string());
            alert.acknowledged_at = Some(at);
        }
        if !alert.is_resolved {
            alert.is_resolved = true;
            alert.resolved_by = Some(by.to_string());
            alert.resolved_at = Some(at);
        }
        Ok(alert.clone())
    }

    /// Alerts matching the filter, newest first
    pub fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StorageError> {
        let mut alerts: Vec<Alert> = lock(&self.alerts)?
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    // --- geofences ---------------------------------------------------------

    pub fn insert_geofence(
        &self,
        organization_id: &str,
        draft: GeofenceDraft,
        now: DateTime<Utc>,
    ) -> Result<Geofence, StorageError> {
        let geofence = draft.into_geofence(new_id("geofence"), organization_id.to_string(), now);
        lock(&self.geofences)?.push(geofence.clone());
        debug!(geofence = %geofence.id, "Inserted geofence");
        Ok(geofence)
    }

    pub fn get_geofence(&self, id: &str) -> Result<Geofence, StorageError> {
        lock(&self.geofences)?
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("geofence", id))
    }

    pub fn update_geofence(
        &self,
        id: &str,
        patch: &GeofencePatch,
        now: DateTime<Utc>,
    ) -> Result<Geofence, StorageError> {
        let mut geofences = lock(&self.geofences)?;
        let geofence = geofences
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| StorageError::not_found("geofence", id))?;
        patch.apply_to(geofence);
        geofence.updated_at = now;
        Ok(geofence.clone())
    }

    pub fn delete_geofence(&self, id: &str) -> Result<Geofence, StorageError> {
        let mut geofences = lock(&self.geofences)?;
        let index = geofences
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| StorageError::not_found("geofence", id))?;
        Ok(geofences.remove(index))
    }

    /// Geofences of one organization, or all when `organization_id` is None
    pub fn list_geofences(&self, organization_id: Option<&str>) -> Result<Vec<Geofence>, StorageError> {
        Ok(lock(&self.geofences)?
            .iter()
            .filter(|g| organization_id.map_or(true, |o| g.organization_id == o))
            .cloned()
            .collect())
    }

    // --- tracking ----------------------------------------------------------

    /// Append a sample and return the vehicle's previous latest sample
    pub fn record_sample(&self, sample: TrackingSample) -> Result<Option<TrackingSample>, StorageError> {
        let mut tracking = lock(&self.tracking)?;
        let history = tracking.entry(sample.vehicle_id.clone()).or_default();
        let previous = history.back().cloned();

        // Enforce retention
        while history.len() >= self.max_samples_per_vehicle {
            history.pop_front();
        }

        history.push_back(sample);
        Ok(previous)
    }

    pub fn latest_sample(&self, vehicle_id: &str) -> Result<Option<TrackingSample>, StorageError> {
        Ok(lock(&self.tracking)?
            .get(vehicle_id)
            .and_then(|h| h.back().cloned()))
    }

    /// Samples for a vehicle within `[start, end]`, oldest first
    pub fn history(
        &self,
        vehicle_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrackingSample>, StorageError> {
        Ok(lock(&self.tracking)?
            .get(vehicle_id)
            .map(|h| {
                h.iter()
                    .filter(|s| start.map_or(true, |t| s.timestamp >= t))
                    .filter(|s| end.map_or(true, |t| s.timestamp <= t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn sample_count(&self) -> usize {
        self.tracking
            .lock()
            .map(|t| t.values().map(|h| h.len()).sum())
            .unwrap_or(0)
    }

    // --- SOS ---------------------------------------------------------------

    pub fn insert_incident(&self, incident: SosIncident) -> Result<SosIncident, StorageError> {
        lock(&self.incidents)?.push(incident.clone());
        info!(incident = %incident.id, vehicle = %incident.vehicle_id, "SOS incident recorded");
        Ok(incident)
    }

    pub fn list_incidents(&self, organization_id: Option<&str>) -> Result<Vec<SosIncident>, StorageError> {
        Ok(lock(&self.incidents)?
            .iter()
            .filter(|i| organization_id.map_or(true, |o| i.organization_id == o))
            .cloned()
            .collect())
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::draft;
    use crate::model::{AlertType, Role, Severity, SosStatus};
    use chrono::Duration;

    fn sample(vehicle: &str, at: DateTime<Utc>) -> TrackingSample {
        TrackingSample {
            id: String::new(),
            vehicle_id: vehicle.to_string(),
            latitude: 24.7136,
            longitude: 46.6753,
            altitude: 0.0,
            speed: 40.0,
            heading: 0.0,
            accuracy: 5.0,
            is_engine_on: true,
            fuel_level: 60.0,
            temperature: None,
            battery_voltage: None,
            gps_signal_strength: None,
            timestamp: at,
        }
    }

    fn alert_draft(vehicle: &str, severity: Severity) -> AlertDraft {
        AlertDraft {
            organization_id: None,
            vehicle_id: vehicle.to_string(),
            kind: AlertType::Speeding,
            severity: Some(severity),
            title: "Speed Limit Exceeded".to_string(),
            message: "too fast".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            speed: Some(135.0),
            geofence_id: None,
        }
    }

    #[test]
    fn test_vehicle_insert_and_retrieve() {
        let repo = Repository::new();
        let vehicle = repo.insert_vehicle("org_a", draft(), Utc::now()).unwrap();
        assert!(vehicle.id.starts_with("vehicle_"));
        assert_eq!(repo.get_vehicle(&vehicle.id).unwrap().license_plate, "RYD-001-2024");
        assert_eq!(repo.vehicle_count(), 1);

        let dup = repo.insert_vehicle("org_a", draft(), Utc::now());
        assert!(matches!(dup, Err(StorageError::Conflict(_))));
    }

    #[test]
    fn test_vehicle_filter() {
        let repo = Repository::new();
        repo.insert_vehicle("org_a", draft(), Utc::now()).unwrap();
        let mut other = draft();
        other.license_plate = "JED-003-2024".to_string();
        other.make = "Mercedes-Benz".to_string();
        repo.insert_vehicle("org_b", other, Utc::now()).unwrap();

        let filter = VehicleFilter {
            organization_id: Some("org_b".to_string()),
            search: None,
        };
        assert_eq!(repo.list_vehicles(&filter).unwrap().len(), 1);

        let filter = VehicleFilter {
            organization_id: None,
            search: Some("toyo".to_string()),
        };
        let found = repo.list_vehicles(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].make, "Toyota");
    }

    #[test]
    fn test_alert_lifecycle() {
        let repo = Repository::new();
        let t0 = Utc::now();
        let alert = repo
            .insert_alert("org_a", alert_draft("vehicle_001", Severity::High), t0)
            .unwrap();
        assert!(!alert.is_read);

        let acked = repo.acknowledge_alert(&alert.id, "user_fm", t0).unwrap();
        assert!(acked.is_read);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("user_fm"));

        let resolved = repo
            .resolve_alert(&alert.id, "user_admin", t0 + Duration::minutes(5))
            .unwrap();
        assert!(resolved.is_resolved);
        assert_eq!(resolved.acknowledged_by.as_deref(), Some("user_fm"));
        assert_eq!(resolved.resolved_by.as_deref(), Some("user_admin"));

        assert!(matches!(
            repo.acknowledge_alert("missing", "x", t0),
            Err(StorageError::NotFound { entity: "alert", .. })
        ));
    }

    #[test]
    fn test_alerts_newest_first_and_filtered() {
        let repo = Repository::new();
        let t0 = Utc::now();
        repo.insert_alert("org_a", alert_draft("v1", Severity::Low), t0 - Duration::hours(2))
            .unwrap();
        repo.insert_alert("org_a", alert_draft("v2", Severity::Critical), t0)
            .unwrap();
        repo.insert_alert("org_b", alert_draft("v1", Severity::Critical), t0 - Duration::hours(1))
            .unwrap();

        let all = repo.list_alerts(&AlertFilter::default()).unwrap();
        let vehicles: Vec<&str> = all.iter().map(|a| a.vehicle_id.as_str()).collect();
        assert_eq!(vehicles, vec!["v2", "v1", "v1"]);

        let filter = AlertFilter {
            organization_id: Some("org_a".to_string()),
            severity: Some(Severity::Critical),
            ..Default::default()
        };
        let critical = repo.list_alerts(&filter).unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].vehicle_id, "v2");
    }

    #[test]
    fn test_record_sample_returns_previous() {
        let repo = Repository::new();
        let t0 = Utc::now();
        assert!(repo.record_sample(sample("v1", t0)).unwrap().is_none());
        let prev = repo
            .record_sample(sample("v1", t0 + Duration::seconds(30)))
            .unwrap()
            .unwrap();
        assert_eq!(prev.timestamp, t0);
        assert_eq!(
            repo.latest_sample("v1").unwrap().unwrap().timestamp,
            t0 + Duration::seconds(30)
        );
    }

    #[test]
    fn test_retention_limit() {
        let repo = Repository::with_retention(5);
        let t0 = Utc::now();
        for i in 0..10 {
            repo.record_sample(sample("v1", t0 + Duration::seconds(i))).unwrap();
        }
        assert_eq!(repo.sample_count(), 5);
        let history = repo.history("v1", None, None).unwrap();
        assert_eq!(history[0].timestamp, t0 + Duration::seconds(5));
    }

    #[test]
    fn test_history_window() {
        let repo = Repository::new();
        let t0 = Utc::now();
        for i in 0..6 {
            repo.record_sample(sample("v1", t0 + Duration::minutes(i))).unwrap();
        }
        let window = repo
            .history("v1", Some(t0 + Duration::minutes(2)), Some(t0 + Duration::minutes(4)))
            .unwrap();
        assert_eq!(window.len(), 3);
        assert!(repo.history("unknown", None, None).unwrap().is_empty());
    }

    #[test]
    fn test_accounts_unique_email() {
        let repo = Repository::new();
        let user = User {
            id: "user_fm".to_string(),
            email: "fleet@example.com".to_string(),
            first_name: "Fleet".to_string(),
            last_name: "Manager".to_string(),
            role: Role::FleetManager,
            organization_id: "org_a".to_string(),
            phone_number: String::new(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        repo.insert_account(user.clone(), "digest".to_string()).unwrap();
        assert!(repo.insert_account(user, "other".to_string()).is_err());

        let (found, digest) = repo.find_account("FLEET@example.com").unwrap().unwrap();
        assert_eq!(found.id, "user_fm");
        assert_eq!(digest, "digest");

        let stamped = repo.record_login("user_fm", Utc::now()).unwrap();
        assert!(stamped.last_login.is_some());
    }

    #[test]
    fn test_incidents_by_organization() {
        let repo = Repository::new();
        let incident = |id: &str, org: &str| SosIncident {
            id: id.to_string(),
            organization_id: org.to_string(),
            vehicle_id: "vehicle_001".to_string(),
            driver_id: None,
            alert_id: None,
            latitude: 24.71,
            longitude: 46.67,
            status: SosStatus::Active,
            description: None,
            emergency_services: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        repo.insert_incident(incident("sos_1", "org_a")).unwrap();
        repo.insert_incident(incident("sos_2", "org_b")).unwrap();

        assert_eq!(repo.list_incidents(None).unwrap().len(), 2);
        let scoped = repo.list_incidents(Some("org_b")).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, "sos_2");
    }
}
