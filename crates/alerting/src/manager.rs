//! Alert Manager Implementation

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use storage::{AlertDraft, AlertType};
use tracing::{debug, info, warn};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Cooldown period between duplicate alerts (seconds)
    pub cooldown_seconds: i64,
    /// Maximum alerts per hour before throttling
    pub max_alerts_per_hour: usize,
    /// Fuel level drop (percentage points) treated as theft while stationary
    pub fuel_drop_threshold: f64,
    /// Battery voltage below which a low battery alert is raised
    pub low_battery_voltage: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 600, // 10 minutes
            max_alerts_per_hour: 120,
            fuel_drop_threshold: 15.0,
            low_battery_voltage: 11.5,
        }
    }
}

/// Deduplication key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub vehicle_id: String,
    pub kind: AlertType,
    pub geofence_id: Option<String>,
}

impl AlertKey {
    pub fn new(vehicle_id: &str, kind: AlertType, geofence_id: Option<&str>) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            kind,
            geofence_id: geofence_id.map(str::to_string),
        }
    }

    pub fn for_draft(draft: &AlertDraft) -> Self {
        Self::new(&draft.vehicle_id, draft.kind, draft.geofence_id.as_deref())
    }
}

/// State of an alert
#[derive(Debug, Clone)]
pub struct AlertState {
    /// Last time this alert was fired
    pub last_fired: DateTime<Utc>,
    /// Number of times fired
    pub fire_count: usize,
    /// Whether alert is acknowledged
    pub acknowledged: bool,
}

/// Alert manager for deduplication and throttling
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Alert states by key
    states: HashMap<AlertKey, AlertState>,
    /// Alerts fired in current hour
    hourly_count: usize,
    /// Hour start time
    hour_start: Option<DateTime<Utc>>,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            states: HashMap::new(),
            hourly_count: 0,
            hour_start: None,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Check if an alert should be fired. Panic button alerts always fire.
    pub fn should_fire(&mut self, key: &AlertKey, now: DateTime<Utc>) -> bool {
        if key.kind == AlertType::PanicButton {
            return true;
        }

        // Reset hourly counter if needed
        match self.hour_start {
            Some(start) if now - start < Duration::hours(1) => {}
            _ => {
                self.hourly_count = 0;
                self.hour_start = Some(now);
            }
        }

        // Check hourly throttle
        if self.hourly_count >= self.config.max_alerts_per_hour {
            warn!(vehicle = %key.vehicle_id, kind = key.kind.as_str(), "Alert throttled: max alerts per hour reached");
            return false;
        }

        // Check cooldown
        if let Some(state) = self.states.get(key) {
            if now - state.last_fired < Duration::seconds(self.config.cooldown_seconds) {
                debug!(vehicle = %key.vehicle_id, kind = key.kind.as_str(), "Alert suppressed: in cooldown period");
                return false;
            }
        }

        true
    }

    /// Record that an alert was fired
    pub fn record_fire(&mut self, key: &AlertKey, now: DateTime<Utc>) {
        if key.kind != AlertType::PanicButton {
            self.hourly_count += 1;
        }

        let state = self.states.entry(key.clone()).or_insert(AlertState {
            last_fired: now,
            fire_count: 0,
            acknowledged: false,
        });

        state.last_fired = now;
        state.fire_count += 1;
        state.acknowledged = false;

        info!(
            vehicle = %key.vehicle_id,
            kind = key.kind.as_str(),
            count = state.fire_count,
            "Alert recorded"
        );
    }

    /// `should_fire` followed by `record_fire` when admitted
    pub fn admit(&mut self, key: &AlertKey, now: DateTime<Utc>) -> bool {
        let fire = self.should_fire(key, now);
        if fire {
            self.record_fire(key, now);
        }
        fire
    }

    /// Acknowledge an alert
    pub fn acknowledge(&mut self, key: &AlertKey) -> bool {
        if let Some(state) = self.states.get_mut(key) {
            state.acknowledged = true;
            info!(vehicle = %key.vehicle_id, kind = key.kind.as_str(), "Alert acknowledged");
            true
        } else {
            false
        }
    }

    /// Get pending (unacknowledged) alerts
    pub fn get_pending(&self) -> Vec<(&AlertKey, &AlertState)> {
        self.states
            .iter()
            .filter(|(_, state)| !state.acknowledged)
            .collect()
    }

    /// Get hourly alert count
    pub fn hourly_count(&self) -> usize {
        self.hourly_count
    }

    /// Clear all alert states
    pub fn clear(&mut self) {
        self.states.clear();
        self.hourly_count = 0;
        self.hour_start = None;
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn speeding(vehicle: &str) -> AlertKey {
        AlertKey::new(vehicle, AlertType::Speeding, None)
    }

    #[test]
    fn test_deduplication() {
        let mut manager = AlertManager::default();
        let key = speeding("vehicle_001");

        assert!(manager.admit(&key, t0()));
        // Immediate duplicate should not fire
        assert!(!manager.admit(&key, t0() + Duration::seconds(30)));
        // Other vehicles are independent
        assert!(manager.admit(&speeding("vehicle_002"), t0()));
        // Cooldown elapsed
        assert!(manager.admit(&key, t0() + Duration::seconds(600)));
    }

    #[test]
    fn test_geofence_is_part_of_key() {
        let mut manager = AlertManager::default();
        let a = AlertKey::new("vehicle_001", AlertType::GeofenceEntry, Some("geo_a"));
        let b = AlertKey::new("vehicle_001", AlertType::GeofenceEntry, Some("geo_b"));

        assert!(manager.admit(&a, t0()));
        assert!(manager.admit(&b, t0()));
        assert!(!manager.admit(&a, t0()));
    }

    #[test]
    fn test_hourly_throttle() {
        let config = AlertConfig {
            max_alerts_per_hour: 2,
            ..Default::default()
        };
        let mut manager = AlertManager::new(config);

        assert!(manager.admit(&speeding("v1"), t0()));
        assert!(manager.admit(&speeding("v2"), t0()));
        assert!(!manager.admit(&speeding("v3"), t0()));
        assert_eq!(manager.hourly_count(), 2);

        // New hour
        assert!(manager.admit(&speeding("v3"), t0() + Duration::minutes(61)));
        assert_eq!(manager.hourly_count(), 1);
    }

    #[test]
    fn test_panic_button_never_throttled() {
        let config = AlertConfig {
            max_alerts_per_hour: 0,
            ..Default::default()
        };
        let mut manager = AlertManager::new(config);
        let key = AlertKey::new("vehicle_001", AlertType::PanicButton, None);

        assert!(manager.admit(&key, t0()));
        assert!(manager.admit(&key, t0()));
        assert_eq!(manager.hourly_count(), 0);
    }

    #[test]
    fn test_acknowledgement() {
        let mut manager = AlertManager::default();
        let key = speeding("vehicle_001");
        manager.record_fire(&key, t0());

        assert_eq!(manager.get_pending().len(), 1);
        assert!(manager.acknowledge(&key));
        assert!(manager.get_pending().is_empty());
        assert!(!manager.acknowledge(&speeding("vehicle_404")));
    }
}
