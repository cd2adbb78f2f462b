//! Driver status classification

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Samples older than this many minutes mark the vehicle offline
pub const OFFLINE_AFTER_MINUTES: i64 = 15;

/// Below this speed (km/h) a reporting vehicle is idle
pub const IDLE_SPEED_KMH: f64 = 5.0;

/// Live driver status derived from the latest sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Driving,
    Idle,
    Offline,
}

impl DriverStatus {
    /// Classify a sample taken at `sampled_at` with the given speed.
    ///
    /// Recomputed fresh each time; no transition history is kept.
    pub fn classify(sampled_at: DateTime<Utc>, speed_kmh: f64, now: DateTime<Utc>) -> Self {
        if now - sampled_at > Duration::minutes(OFFLINE_AFTER_MINUTES) {
            DriverStatus::Offline
        } else if speed_kmh < IDLE_SPEED_KMH {
            DriverStatus::Idle
        } else {
            DriverStatus::Driving
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Driving => "driving",
            DriverStatus::Idle => "idle",
            DriverStatus::Offline => "offline",
        }
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driving" => Ok(DriverStatus::Driving),
            "idle" => Ok(DriverStatus::Idle),
            "offline" => Ok(DriverStatus::Offline),
            other => Err(format!("unknown driver status '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-06-02T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_idle() {
        let status = DriverStatus::classify(now() - Duration::minutes(1), 0.0, now());
        assert_eq!(status, DriverStatus::Idle);
    }

    #[test]
    fn test_driving() {
        let status = DriverStatus::classify(now() - Duration::minutes(1), 80.0, now());
        assert_eq!(status, DriverStatus::Driving);
    }

    #[test]
    fn test_offline_regardless_of_speed() {
        for speed in [0.0, 4.9, 5.0, 80.0, 200.0] {
            let status = DriverStatus::classify(now() - Duration::minutes(20), speed, now());
            assert_eq!(status, DriverStatus::Offline);
        }
    }

    #[test]
    fn test_thresholds() {
        // Exactly 15 minutes is still live
        assert_eq!(
            DriverStatus::classify(now() - Duration::minutes(15), 10.0, now()),
            DriverStatus::Driving
        );
        assert_eq!(
            DriverStatus::classify(now() - Duration::seconds(15 * 60 + 1), 10.0, now()),
            DriverStatus::Offline
        );
        assert_eq!(
            DriverStatus::classify(now(), IDLE_SPEED_KMH, now()),
            DriverStatus::Driving
        );
    }

    #[test]
    fn test_future_sample_not_offline() {
        let status = DriverStatus::classify(now() + Duration::hours(1), 0.0, now());
        assert_eq!(status, DriverStatus::Idle);
    }

    #[test]
    fn test_parse_round_trip() {
        for status in [DriverStatus::Driving, DriverStatus::Idle, DriverStatus::Offline] {
            assert_eq!(status.as_str().parse::<DriverStatus>(), Ok(status));
        }
        assert!("parked".parse::<DriverStatus>().is_err());
    }
}
